use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::{Cents, Group, GroupId, MemberId, checked_sum};

pub type ExpenseId = Uuid;

/// One member's share of an expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub member_id: MemberId,
    /// Amount owed in cents (never negative)
    pub bill: Cents,
}

impl Split {
    pub fn new(member_id: MemberId, bill: Cents) -> Self {
        Self { member_id, bill }
    }
}

/// A committed expense. Expenses are immutable once recorded; corrections are
/// made by recording an offsetting expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    /// Monotonically increasing sequence number for ordering
    pub sequence: i64,
    pub group_id: GroupId,
    pub paid_by: MemberId,
    /// Total spend in cents; always equals the sum of the splits
    pub total: Cents,
    pub splits: Vec<Split>,
    pub description: Option<String>,
    /// When the expense was committed by the allocator
    pub created_at: DateTime<Utc>,
    /// When the ledger stored it
    pub recorded_at: DateTime<Utc>,
}

/// A reason an expense cannot enter (or be trusted from) the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseViolation {
    #[error("expense belongs to group {found}, not {expected}")]
    GroupMismatch { expected: GroupId, found: GroupId },

    #[error("total must be positive, got {0} cents")]
    NonPositiveTotal(Cents),

    #[error("expense has no splits")]
    EmptySplits,

    #[error("bill for member {member} is negative ({bill} cents)")]
    NegativeBill { member: MemberId, bill: Cents },

    #[error("splits add up to {allocated} cents but the total is {total} cents")]
    TotalMismatch { total: Cents, allocated: Cents },

    #[error("splits add up to more than the largest representable amount")]
    AmountOverflow,

    #[error("payer {0} is not a member of the group")]
    PayerNotInGroup(MemberId),

    #[error("split member {0} is not a member of the group")]
    MemberNotInGroup(MemberId),

    #[error("member {0} has more than one split")]
    DuplicateSplit(MemberId),

    #[error("stored record could not be read: {0}")]
    Unreadable(String),
}

impl Expense {
    /// Create a new expense. Sequence number must be assigned by the repository.
    pub fn new(group_id: GroupId, paid_by: MemberId, total: Cents, splits: Vec<Split>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            sequence: 0, // Will be set by repository
            group_id,
            paid_by,
            total,
            splits,
            description: None,
            created_at: now,
            recorded_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sum of all bills, or `None` if it does not fit in [`Cents`].
    pub fn allocated(&self) -> Option<Cents> {
        checked_sum(self.splits.iter().map(|s| s.bill))
    }

    pub fn bill_for(&self, member_id: MemberId) -> Option<Cents> {
        self.splits
            .iter()
            .find(|s| s.member_id == member_id)
            .map(|s| s.bill)
    }

    /// Check every ledger invariant against the owning group.
    pub fn validate(&self, group: &Group) -> Result<(), ExpenseViolation> {
        if self.group_id != group.id {
            return Err(ExpenseViolation::GroupMismatch {
                expected: group.id,
                found: self.group_id,
            });
        }
        if self.total <= 0 {
            return Err(ExpenseViolation::NonPositiveTotal(self.total));
        }
        if self.splits.is_empty() {
            return Err(ExpenseViolation::EmptySplits);
        }
        if !group.is_member(self.paid_by) {
            return Err(ExpenseViolation::PayerNotInGroup(self.paid_by));
        }

        let mut seen = HashSet::new();
        for split in &self.splits {
            if !group.is_member(split.member_id) {
                return Err(ExpenseViolation::MemberNotInGroup(split.member_id));
            }
            if !seen.insert(split.member_id) {
                return Err(ExpenseViolation::DuplicateSplit(split.member_id));
            }
            if split.bill < 0 {
                return Err(ExpenseViolation::NegativeBill {
                    member: split.member_id,
                    bill: split.bill,
                });
            }
        }

        let allocated = self.allocated().ok_or(ExpenseViolation::AmountOverflow)?;
        if allocated != self.total {
            return Err(ExpenseViolation::TotalMismatch {
                total: self.total,
                allocated,
            });
        }
        Ok(())
    }

    pub fn to_payload(&self) -> ExpensePayload {
        ExpensePayload {
            group_id: self.group_id,
            paid_by: self.paid_by,
            total: self.total,
            splits: self
                .splits
                .iter()
                .map(|s| SplitPayload {
                    user_id: s.member_id,
                    bill: s.bill,
                })
                .collect(),
            description: self.description.clone(),
        }
    }
}

/// Request/response shape of an expense at the service boundary.
/// Amounts are integer cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpensePayload {
    pub group_id: GroupId,
    pub paid_by: MemberId,
    pub total: Cents,
    pub splits: Vec<SplitPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitPayload {
    pub user_id: MemberId,
    pub bill: Cents,
}

impl ExpensePayload {
    /// Build an unrecorded expense with a fresh id and timestamp.
    /// No validation happens here; the ledger validates on append.
    pub fn into_expense(self) -> Expense {
        let splits = self
            .splits
            .into_iter()
            .map(|s| Split::new(s.user_id, s.bill))
            .collect();
        let expense = Expense::new(self.group_id, self.paid_by, self.total, splits);
        match self.description {
            Some(desc) => expense.with_description(desc),
            None => expense,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Member;

    fn sample_group() -> (Group, Member, Member) {
        let a = Member::new("Alice", "alice@example.com");
        let b = Member::new("Bob", "bob@example.com");
        let group = Group::new("Flat", a.id, vec![a.clone(), b.clone()]).unwrap();
        (group, a, b)
    }

    #[test]
    fn test_valid_expense() {
        let (group, a, b) = sample_group();
        let expense = Expense::new(
            group.id,
            a.id,
            5000,
            vec![Split::new(a.id, 2500), Split::new(b.id, 2500)],
        )
        .with_description("Groceries");

        assert!(expense.validate(&group).is_ok());
        assert_eq!(expense.bill_for(b.id), Some(2500));
        assert_eq!(expense.description.as_deref(), Some("Groceries"));
    }

    #[test]
    fn test_total_mismatch_is_rejected() {
        let (group, a, b) = sample_group();
        let expense = Expense::new(
            group.id,
            a.id,
            5000,
            vec![Split::new(a.id, 2500), Split::new(b.id, 2499)],
        );

        assert_eq!(
            expense.validate(&group),
            Err(ExpenseViolation::TotalMismatch {
                total: 5000,
                allocated: 4999
            })
        );
    }

    #[test]
    fn test_overflowing_splits_are_rejected() {
        let (a, b, c) = (
            Member::new("Ann", "ann@example.com"),
            Member::new("Ben", "ben@example.com"),
            Member::new("Cal", "cal@example.com"),
        );
        let group = Group::new("Big", a.id, vec![a.clone(), b.clone(), c.clone()]).unwrap();
        let expense = Expense::new(
            group.id,
            a.id,
            100,
            vec![
                Split::new(a.id, Cents::MAX),
                Split::new(b.id, Cents::MAX),
                Split::new(c.id, 102),
            ],
        );

        assert_eq!(expense.allocated(), None);
        assert_eq!(
            expense.validate(&group),
            Err(ExpenseViolation::AmountOverflow)
        );
    }

    #[test]
    fn test_membership_is_enforced() {
        let (group, a, _) = sample_group();
        let stranger = Member::new("Eve", "eve@example.com");

        let foreign_payer = Expense::new(group.id, stranger.id, 100, vec![Split::new(a.id, 100)]);
        assert_eq!(
            foreign_payer.validate(&group),
            Err(ExpenseViolation::PayerNotInGroup(stranger.id))
        );

        let foreign_split = Expense::new(group.id, a.id, 100, vec![Split::new(stranger.id, 100)]);
        assert_eq!(
            foreign_split.validate(&group),
            Err(ExpenseViolation::MemberNotInGroup(stranger.id))
        );
    }

    #[test]
    fn test_negative_and_duplicate_splits() {
        let (group, a, b) = sample_group();

        let negative = Expense::new(
            group.id,
            a.id,
            100,
            vec![Split::new(a.id, 200), Split::new(b.id, -100)],
        );
        assert!(matches!(
            negative.validate(&group),
            Err(ExpenseViolation::NegativeBill { .. })
        ));

        let duplicate = Expense::new(
            group.id,
            a.id,
            100,
            vec![Split::new(a.id, 50), Split::new(a.id, 50)],
        );
        assert_eq!(
            duplicate.validate(&group),
            Err(ExpenseViolation::DuplicateSplit(a.id))
        );
    }

    #[test]
    fn test_empty_and_non_positive() {
        let (group, a, _) = sample_group();
        assert_eq!(
            Expense::new(group.id, a.id, 100, vec![]).validate(&group),
            Err(ExpenseViolation::EmptySplits)
        );
        assert_eq!(
            Expense::new(group.id, a.id, 0, vec![Split::new(a.id, 0)]).validate(&group),
            Err(ExpenseViolation::NonPositiveTotal(0))
        );
    }

    #[test]
    fn test_payload_uses_wire_field_names() {
        let (group, a, b) = sample_group();
        let expense = Expense::new(
            group.id,
            a.id,
            3000,
            vec![Split::new(a.id, 1000), Split::new(b.id, 2000)],
        );

        let json = serde_json::to_value(expense.to_payload()).unwrap();
        assert_eq!(json["groupId"], group.id.to_string());
        assert_eq!(json["paidBy"], a.id.to_string());
        assert_eq!(json["total"], 3000);
        assert_eq!(json["splits"][1]["userId"], b.id.to_string());
        assert_eq!(json["splits"][1]["bill"], 2000);
        assert!(json.get("description").is_none());
    }

    #[test]
    fn test_payload_into_expense_gets_fresh_id() {
        let (group, a, _) = sample_group();
        let original = Expense::new(group.id, a.id, 100, vec![Split::new(a.id, 100)]);
        let rebuilt = original.to_payload().into_expense();

        assert_ne!(rebuilt.id, original.id);
        assert_eq!(rebuilt.splits, original.splits);
        assert!(rebuilt.validate(&group).is_ok());
    }
}
