use proptest::prelude::*;
use splitbill::domain::{
    AllocationDraft, Cents, Expense, Group, Member, Split, SplitStrategy, compute_net,
    split_evenly,
};

fn members(n: usize) -> Vec<Member> {
    (0..n)
        .map(|i| Member::new(format!("M{}", i), format!("m{}@example.com", i)))
        .collect()
}

fn group(n: usize) -> Group {
    let members = members(n);
    Group::new("Prop", members[0].id, members).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        ..ProptestConfig::default()
    })]

    /// Equal shares always add up to the total and differ by at most a cent.
    #[test]
    fn equal_split_sums_to_total(total in 1i64..10_000_000i64, parts in 1usize..20) {
        let shares = split_evenly(total, parts);
        prop_assert_eq!(shares.len(), parts);
        prop_assert_eq!(shares.iter().sum::<Cents>(), total);

        let max = *shares.iter().max().unwrap();
        let min = *shares.iter().min().unwrap();
        prop_assert!(max - min <= 1);
        prop_assert!(shares.windows(2).all(|w| w[0] >= w[1]));
    }

    /// Stepping forward and back restores cursor and remainder exactly.
    #[test]
    fn advance_then_retreat_is_identity(
        bills in prop::collection::vec(0i64..10_000i64, 2..8),
        steps in 0usize..8,
    ) {
        let total: Cents = bills.iter().sum::<Cents>() + 1;
        let mut draft = AllocationDraft::begin(
            uuid::Uuid::new_v4(),
            total,
            SplitStrategy::Custom,
            members(bills.len()),
        ).unwrap();

        let position = steps.min(bills.len() - 1);
        for &bill in &bills[..position] {
            draft.set_bill_for_current(bill).unwrap();
            draft.advance().unwrap();
        }
        draft.set_bill_for_current(bills[position]).unwrap();

        let before = draft.state();
        draft.advance().unwrap();
        draft.retreat().unwrap();
        prop_assert_eq!(draft.state(), before);
        prop_assert_eq!(draft.cursor(), Some(position));
        prop_assert_eq!(
            draft.outstanding(),
            Ok(total - bills[..=position].iter().sum::<Cents>())
        );
    }

    /// Whatever the ledger holds, what X is owed by Y is what Y owes X.
    #[test]
    fn net_balances_are_anti_symmetric(
        entries in prop::collection::vec(
            (0usize..4, prop::collection::vec(0i64..50_000i64, 4)),
            1..12,
        )
    ) {
        let group = group(4);
        let expenses: Vec<Expense> = entries
            .iter()
            .filter(|(_, bills)| bills.iter().sum::<Cents>() > 0)
            .map(|(payer, bills)| {
                let splits = group
                    .members
                    .iter()
                    .zip(bills)
                    .map(|(m, &bill)| Split::new(m.id, bill))
                    .collect();
                Expense::new(group.id, group.members[*payer].id, bills.iter().sum(), splits)
            })
            .collect();

        for x in &group.members {
            let sheet_x = compute_net(&group, &expenses, x.id).unwrap();
            prop_assert!(sheet_x.warnings.is_empty());
            for y in group.members.iter().filter(|y| y.id != x.id) {
                let sheet_y = compute_net(&group, &expenses, y.id).unwrap();
                prop_assert_eq!(sheet_x.net_with(y.id), -sheet_y.net_with(x.id));
            }
        }
    }
}
