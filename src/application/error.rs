use thiserror::Error;

use crate::domain::{AllocationError, BalanceError, ExpenseViolation, GroupViolation};

use super::NotifyError;

/// Broad failure classes, as surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input; fix it and retry. No state was changed.
    Validation,
    /// A referenced group, member or expense does not exist.
    NotFound,
    /// The backing store failed; the whole operation may be retried.
    Persistence,
    /// Notification delivery failed; computed balances are unaffected.
    Notification,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Group not found: {0}")]
    GroupNotFound(String),

    #[error("Group already exists: {0}")]
    GroupAlreadyExists(String),

    #[error("Member not found in group '{group}': {member}")]
    MemberNotFound { group: String, member: String },

    #[error("Expense not found: {0}")]
    ExpenseNotFound(String),

    #[error("Expense already recorded: {0}")]
    ExpenseAlreadyRecorded(String),

    #[error("Invalid group: {0}")]
    InvalidGroup(#[from] GroupViolation),

    #[error("Invalid split: {0}")]
    Allocation(#[from] AllocationError),

    #[error("Invalid expense: {0}")]
    InvalidExpense(#[from] ExpenseViolation),

    #[error("Nothing to notify: {0}")]
    NothingToNotify(String),

    #[error("Notification failed: {0}")]
    Notification(#[from] NotifyError),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::GroupNotFound(_)
            | AppError::MemberNotFound { .. }
            | AppError::ExpenseNotFound(_) => ErrorKind::NotFound,
            AppError::GroupAlreadyExists(_)
            | AppError::ExpenseAlreadyRecorded(_)
            | AppError::InvalidGroup(_)
            | AppError::Allocation(_)
            | AppError::InvalidExpense(_)
            | AppError::NothingToNotify(_) => ErrorKind::Validation,
            AppError::Notification(_) => ErrorKind::Notification,
            AppError::Database(_) => ErrorKind::Persistence,
        }
    }
}

impl From<BalanceError> for AppError {
    fn from(err: BalanceError) -> Self {
        match err {
            BalanceError::UnknownPerspective { member, group } => AppError::MemberNotFound {
                group,
                member: member.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            AppError::GroupNotFound("x".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            AppError::from(AllocationError::NoPayer).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            AppError::from(anyhow::anyhow!("disk full")).kind(),
            ErrorKind::Persistence
        );
    }

    #[test]
    fn test_messages_name_the_failed_condition() {
        let err = AppError::from(AllocationError::NonZeroRemainder(250));
        assert_eq!(
            err.to_string(),
            "Invalid split: non-zero remainder: 250 cents still unallocated"
        );
    }
}
