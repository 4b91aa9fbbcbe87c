use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

use super::{Cents, Expense, ExpenseId, ExpenseViolation, Group, Member, MemberId, checked_sum};

/// Net position between the perspective member and one counterparty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetBalance {
    pub member_id: MemberId,
    pub name: String,
    pub email: String,
    /// Positive: the counterparty owes the perspective member.
    /// Negative: the perspective member owes the counterparty.
    pub net_bill: Cents,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Standing {
    OwesYou,
    YouOwe,
    Settled,
}

impl NetBalance {
    pub fn standing(&self) -> Standing {
        match self.net_bill {
            n if n > 0 => Standing::OwesYou,
            n if n < 0 => Standing::YouOwe,
            _ => Standing::Settled,
        }
    }
}

/// An expense left out of the balances because it breaks a ledger invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityWarning {
    /// `None` when the stored id itself could not be read
    pub expense_id: Option<ExpenseId>,
    pub sequence: i64,
    pub reason: ExpenseViolation,
}

impl std::fmt::Display for IntegrityWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.expense_id {
            Some(id) => write!(
                f,
                "expense #{} ({}) skipped: {}",
                self.sequence, id, self.reason
            ),
            None => write!(f, "expense #{} skipped: {}", self.sequence, self.reason),
        }
    }
}

/// Balances of one member against everyone they share expenses with.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceSheet {
    pub perspective: Member,
    /// One entry per counterparty, in order of first appearance in the ledger
    pub balances: Vec<NetBalance>,
    pub warnings: Vec<IntegrityWarning>,
}

impl BalanceSheet {
    pub fn get(&self, member_id: MemberId) -> Option<&NetBalance> {
        self.balances.iter().find(|b| b.member_id == member_id)
    }

    /// Net amount for a counterparty; zero if they never shared an expense.
    pub fn net_with(&self, member_id: MemberId) -> Cents {
        self.get(member_id).map(|b| b.net_bill).unwrap_or(0)
    }

    /// Sum of what counterparties owe the perspective member, or `None`
    /// if it does not fit in [`Cents`].
    pub fn total_owed_to_perspective(&self) -> Option<Cents> {
        checked_sum(
            self.balances
                .iter()
                .filter(|b| b.net_bill > 0)
                .map(|b| b.net_bill),
        )
    }

    /// Sum of what the perspective member owes (as a positive number), or
    /// `None` if it does not fit in [`Cents`].
    pub fn total_owed_by_perspective(&self) -> Option<Cents> {
        checked_sum(
            self.balances
                .iter()
                .filter(|b| b.net_bill < 0)
                .map(|b| b.net_bill),
        )
        .and_then(Cents::checked_neg)
    }

    pub fn is_settled(&self) -> bool {
        self.balances.iter().all(|b| b.net_bill == 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BalanceError {
    #[error("member {member} is not part of group '{group}'")]
    UnknownPerspective { member: MemberId, group: String },
}

/// Replay a group's expenses and net them from `perspective`'s point of view.
///
/// - When the perspective member paid, every other member's bill is added to
///   that member's entry.
/// - When someone else paid, the perspective member's own bill is subtracted
///   from the payer's entry.
///
/// Expenses that fail validation against the group are skipped and reported
/// as warnings, as are expenses that would push a running net past the range
/// of [`Cents`].
pub fn compute_net(
    group: &Group,
    expenses: &[Expense],
    perspective: MemberId,
) -> Result<BalanceSheet, BalanceError> {
    let perspective_member = group.member(perspective).cloned().ok_or_else(|| {
        BalanceError::UnknownPerspective {
            member: perspective,
            group: group.name.clone(),
        }
    })?;

    let mut balances: Vec<NetBalance> = Vec::new();
    let mut index: HashMap<MemberId, usize> = HashMap::new();
    let mut warnings = Vec::new();

    for expense in expenses {
        if let Err(reason) = expense.validate(group) {
            warnings.push(IntegrityWarning {
                expense_id: Some(expense.id),
                sequence: expense.sequence,
                reason,
            });
            continue;
        }

        // Bills are validated non-negative, so negating them cannot overflow
        let deltas: Vec<(MemberId, Cents)> = if expense.paid_by == perspective {
            expense
                .splits
                .iter()
                .filter(|s| s.member_id != perspective)
                .map(|s| (s.member_id, s.bill))
                .collect()
        } else if let Some(bill) = expense.bill_for(perspective) {
            vec![(expense.paid_by, -bill)]
        } else {
            continue;
        };

        let current = |member_id: &MemberId| {
            index
                .get(member_id)
                .map(|&i| balances[i].net_bill)
                .unwrap_or(0)
        };
        let updated: Option<Vec<(MemberId, Cents)>> = deltas
            .iter()
            .map(|(member_id, delta)| {
                current(member_id)
                    .checked_add(*delta)
                    .map(|net| (*member_id, net))
            })
            .collect();

        let Some(updated) = updated else {
            warnings.push(IntegrityWarning {
                expense_id: Some(expense.id),
                sequence: expense.sequence,
                reason: ExpenseViolation::AmountOverflow,
            });
            continue;
        };
        for (member_id, net) in updated {
            *entry(&mut balances, &mut index, group, member_id) = net;
        }
    }

    Ok(BalanceSheet {
        perspective: perspective_member,
        balances,
        warnings,
    })
}

/// Running total for a counterparty, created at zero on first reference.
/// Only called with members of validated expenses, which belong to `group`.
fn entry<'a>(
    balances: &'a mut Vec<NetBalance>,
    index: &mut HashMap<MemberId, usize>,
    group: &Group,
    member_id: MemberId,
) -> &'a mut Cents {
    let position = *index.entry(member_id).or_insert_with(|| {
        let (name, email) = group
            .member(member_id)
            .map(|m| (m.name.clone(), m.email.clone()))
            .unwrap_or_default();
        balances.push(NetBalance {
            member_id,
            name,
            email,
            net_bill: 0,
        });
        balances.len() - 1
    });
    &mut balances[position].net_bill
}
