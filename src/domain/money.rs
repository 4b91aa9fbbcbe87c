use thiserror::Error;

/// Money is represented as integer cents to avoid floating-point drift.
/// 1 unit = 100 cents, so 50.00 = 5000 cents.
pub type Cents = i64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseCentsError {
    #[error("amount is empty")]
    Empty,

    #[error("'{0}' is not a number")]
    NotNumeric(String),

    #[error("'{0}' is negative; amounts must be zero or more")]
    Negative(String),

    #[error("'{0}' has more than two decimal places")]
    TooPrecise(String),
}

/// Format cents as a human-readable amount.
/// Example: 5000 -> "50.00", -1234 -> "-12.34"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    format!("{}{}", sign, format_abs_cents(cents))
}

/// Format the magnitude of an amount, dropping its sign.
/// Example: -1234 -> "12.34"
pub fn format_abs_cents(cents: Cents) -> String {
    let abs = cents.unsigned_abs();
    format!("{}.{:02}", abs / 100, abs % 100)
}

/// Parse a non-negative decimal amount into cents.
/// Example: "50.00" -> 5000, "12.5" -> 1250, "100" -> 10000
///
/// Inputs with more than two decimals are refused instead of truncated, since
/// a split must add up to the total exactly.
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ParseCentsError::Empty);
    }
    if input.starts_with('-') {
        return Err(ParseCentsError::Negative(input.to_string()));
    }

    let not_numeric = || ParseCentsError::NotNumeric(input.to_string());
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());

    let (units_str, decimals_str) = match input.split_once('.') {
        Some((units, decimals)) => (units, decimals),
        None => (input, ""),
    };

    if (units_str.is_empty() && decimals_str.is_empty())
        || !all_digits(units_str)
        || !all_digits(decimals_str)
    {
        return Err(not_numeric());
    }
    if decimals_str.len() > 2 {
        return Err(ParseCentsError::TooPrecise(input.to_string()));
    }

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        units_str.parse().map_err(|_| not_numeric())?
    };
    let decimals: i64 = match decimals_str.len() {
        0 => 0,
        // "12.5" means 50 cents
        1 => decimals_str.parse::<i64>().map_err(|_| not_numeric())? * 10,
        _ => decimals_str.parse().map_err(|_| not_numeric())?,
    };

    units
        .checked_mul(100)
        .and_then(|c| c.checked_add(decimals))
        .ok_or_else(not_numeric)
}

/// Add up amounts, or `None` if the sum does not fit in [`Cents`].
pub fn checked_sum<I>(amounts: I) -> Option<Cents>
where
    I: IntoIterator<Item = Cents>,
{
    amounts.into_iter().try_fold(0, Cents::checked_add)
}

/// Divide `total` into `parts` shares that add up to `total` exactly.
///
/// Every share gets `total / parts`; the first `total % parts` shares get one
/// extra cent. Returns an empty vector when `parts` is zero.
pub fn split_evenly(total: Cents, parts: usize) -> Vec<Cents> {
    if parts == 0 {
        return Vec::new();
    }
    let n = parts as i64;
    let base = total / n;
    let extra = (total % n) as usize;
    (0..parts)
        .map(|i| if i < extra { base + 1 } else { base })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_sum() {
        assert_eq!(checked_sum([100, 250, 0]), Some(350));
        assert_eq!(checked_sum(Vec::new()), Some(0));
        assert_eq!(checked_sum([Cents::MAX, 1]), None);
        assert_eq!(checked_sum([Cents::MAX, Cents::MAX, 102]), None);
    }

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(5000), "50.00");
        assert_eq!(format_cents(1234), "12.34");
        assert_eq!(format_cents(1), "0.01");
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(-3000), "-30.00");
        assert_eq!(format_cents(-1), "-0.01");
        assert_eq!(format_cents(Cents::MIN), "-92233720368547758.08");
        assert_eq!(format_abs_cents(-1250), "12.50");
    }

    #[test]
    fn test_parse_cents() {
        assert_eq!(parse_cents("50.00"), Ok(5000));
        assert_eq!(parse_cents("50"), Ok(5000));
        assert_eq!(parse_cents(" 12.34 "), Ok(1234));
        assert_eq!(parse_cents("12.5"), Ok(1250));
        assert_eq!(parse_cents(".50"), Ok(50));
        assert_eq!(parse_cents("7."), Ok(700));
        assert_eq!(parse_cents("0"), Ok(0));
    }

    #[test]
    fn test_parse_cents_rejects_bad_input() {
        assert_eq!(parse_cents(""), Err(ParseCentsError::Empty));
        assert!(matches!(parse_cents("abc"), Err(ParseCentsError::NotNumeric(_))));
        assert!(matches!(parse_cents("1.2.3"), Err(ParseCentsError::NotNumeric(_))));
        assert!(matches!(parse_cents("."), Err(ParseCentsError::NotNumeric(_))));
        assert!(matches!(parse_cents("1e3"), Err(ParseCentsError::NotNumeric(_))));
        assert!(matches!(parse_cents("-5"), Err(ParseCentsError::Negative(_))));
        assert!(matches!(
            parse_cents("10.999"),
            Err(ParseCentsError::TooPrecise(_))
        ));
    }

    #[test]
    fn test_split_evenly_divisible() {
        assert_eq!(split_evenly(30000, 3), vec![10000, 10000, 10000]);
    }

    #[test]
    fn test_split_evenly_assigns_remainder_to_first_members() {
        let shares = split_evenly(10000, 3);
        assert_eq!(shares, vec![3334, 3333, 3333]);
        assert_eq!(shares.iter().sum::<Cents>(), 10000);

        let shares = split_evenly(5, 4);
        assert_eq!(shares, vec![2, 1, 1, 1]);
    }

    #[test]
    fn test_split_evenly_zero_parts() {
        assert!(split_evenly(100, 0).is_empty());
    }
}
