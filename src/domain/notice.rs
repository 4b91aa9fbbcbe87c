use serde::Serialize;

use super::{BalanceSheet, Cents, MemberId, NetBalance, Standing, format_abs_cents};

/// A balance reminder addressed to one counterparty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub to_member: MemberId,
    pub to_name: String,
    pub to_email: String,
    pub subject: String,
    pub message: String,
    pub net_bill: Cents,
}

impl Notice {
    fn for_balance(sender: &str, balance: &NetBalance) -> Self {
        let amount = format_abs_cents(balance.net_bill);
        let message = match balance.standing() {
            Standing::OwesYou => format!("Hi {}, you owe {} {}.", balance.name, sender, amount),
            Standing::YouOwe => format!("Hi {}, {} owes you {}.", balance.name, sender, amount),
            Standing::Settled => format!("Hi {}, you and {} are settled up.", balance.name, sender),
        };

        Self {
            to_member: balance.member_id,
            to_name: balance.name.clone(),
            to_email: balance.email.clone(),
            subject: format!("Your balance with {}", sender),
            message,
            net_bill: balance.net_bill,
        }
    }
}

/// Build one notice per counterparty on the sheet, written from the
/// counterparty's side (the sign is flipped relative to the sheet).
pub fn build_notices(sheet: &BalanceSheet) -> Vec<Notice> {
    let sender = &sheet.perspective.name;
    sheet
        .balances
        .iter()
        .map(|balance| Notice::for_balance(sender, balance))
        .collect()
}
