use std::str::FromStr;

use thiserror::Error;

use super::{
    Cents, Expense, Group, GroupId, Member, MemberId, ParseCentsError, Split, checked_sum,
    parse_cents, split_evenly,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SplitStrategy {
    /// Every member owes the same share, computed up front
    Equal,
    /// Bills are entered one member at a time
    Custom,
}

impl SplitStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SplitStrategy::Equal => "equal",
            SplitStrategy::Custom => "custom",
        }
    }
}

impl FromStr for SplitStrategy {
    type Err = AllocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "equal" => Ok(SplitStrategy::Equal),
            "custom" => Ok(SplitStrategy::Custom),
            other => Err(AllocationError::UnknownStrategy(other.to_string())),
        }
    }
}

impl std::fmt::Display for SplitStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    #[error("total spend must be greater than zero, got {0} cents")]
    NonPositiveTotal(Cents),

    #[error("member list is empty")]
    NoMembers,

    #[error("unknown split strategy '{0}' (expected 'equal' or 'custom')")]
    UnknownStrategy(String),

    #[error("invalid bill: {0}")]
    InvalidBill(#[from] ParseCentsError),

    #[error("invalid bill: {0} cents is negative")]
    NegativeBill(Cents),

    #[error("bills can only be edited for a custom split")]
    NotEditable,

    #[error("every bill has been entered; go back to edit")]
    NotCollecting,

    #[error("bills add up to more than the largest representable amount")]
    AmountOverflow,

    #[error("non-zero remainder: {0} cents still unallocated")]
    NonZeroRemainder(Cents),

    #[error("no payer selected")]
    NoPayer,

    #[error("member {0} is not part of this split")]
    UnknownMember(MemberId),

    #[error("draft already committed")]
    AlreadyCommitted,
}

/// Where an interactive split currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftState {
    /// Entering the bill of the member at `cursor`; `remaining` is the total
    /// minus every bill before the cursor.
    Collecting { cursor: usize, remaining: Cents },
    /// Every bill has been entered; `remaining` accounts for all of them.
    ReadyToCommit { remaining: Cents },
    Committed,
}

/// A split under construction. Owned by a single session and discarded once
/// committed.
#[derive(Debug, Clone)]
pub struct AllocationDraft {
    group_id: GroupId,
    total: Cents,
    strategy: SplitStrategy,
    members: Vec<Member>,
    /// Bills aligned with `members`
    bills: Vec<Cents>,
    paid_by: Option<MemberId>,
    description: Option<String>,
    state: DraftState,
}

impl AllocationDraft {
    pub fn begin(
        group_id: GroupId,
        total: Cents,
        strategy: SplitStrategy,
        members: Vec<Member>,
    ) -> Result<Self, AllocationError> {
        if total <= 0 {
            return Err(AllocationError::NonPositiveTotal(total));
        }
        if members.is_empty() {
            return Err(AllocationError::NoMembers);
        }

        let (bills, state) = match strategy {
            SplitStrategy::Equal => (
                split_evenly(total, members.len()),
                DraftState::ReadyToCommit { remaining: 0 },
            ),
            SplitStrategy::Custom => (
                vec![0; members.len()],
                DraftState::Collecting {
                    cursor: 0,
                    remaining: total,
                },
            ),
        };

        Ok(Self {
            group_id,
            total,
            strategy,
            members,
            bills,
            paid_by: None,
            description: None,
            state,
        })
    }

    /// Start a split over every member of `group`, in group order.
    pub fn for_group(
        group: &Group,
        total: Cents,
        strategy: SplitStrategy,
    ) -> Result<Self, AllocationError> {
        Self::begin(group.id, total, strategy, group.members.clone())
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn state(&self) -> DraftState {
        self.state
    }

    pub fn strategy(&self) -> SplitStrategy {
        self.strategy
    }

    pub fn total(&self) -> Cents {
        self.total
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn paid_by(&self) -> Option<MemberId> {
        self.paid_by
    }

    pub fn is_committed(&self) -> bool {
        self.state == DraftState::Committed
    }

    /// Index of the member being edited. Stays on the last member once every
    /// bill is entered.
    pub fn cursor(&self) -> Option<usize> {
        match self.state {
            DraftState::Collecting { cursor, .. } => Some(cursor),
            DraftState::ReadyToCommit { .. } => Some(self.last_index()),
            DraftState::Committed => None,
        }
    }

    /// Running remainder as shown while entering bills.
    pub fn remaining(&self) -> Cents {
        match self.state {
            DraftState::Collecting { remaining, .. } | DraftState::ReadyToCommit { remaining } => {
                remaining
            }
            DraftState::Committed => 0,
        }
    }

    /// Amount not yet covered by any bill, recomputed from the bills.
    pub fn outstanding(&self) -> Result<Cents, AllocationError> {
        checked_sum(self.bills.iter().copied())
            .and_then(|allocated| self.total.checked_sub(allocated))
            .ok_or(AllocationError::AmountOverflow)
    }

    pub fn current_member(&self) -> Option<&Member> {
        self.cursor().and_then(|i| self.members.get(i))
    }

    pub fn bill_for(&self, member_id: MemberId) -> Option<Cents> {
        self.position_of(member_id).map(|i| self.bills[i])
    }

    /// Members paired with their current bills, in order.
    pub fn bills(&self) -> impl Iterator<Item = (&Member, Cents)> {
        self.members.iter().zip(self.bills.iter().copied())
    }

    /// Overwrite the current member's bill. The remainder is not touched
    /// until the entry is confirmed with [`advance`](Self::advance).
    pub fn set_bill_for_current(&mut self, bill: Cents) -> Result<(), AllocationError> {
        let cursor = self.collecting_cursor()?;
        if bill < 0 {
            return Err(AllocationError::NegativeBill(bill));
        }
        let others = self
            .bills
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != cursor)
            .map(|(_, &b)| b);
        if checked_sum(others.chain([bill])).is_none() {
            return Err(AllocationError::AmountOverflow);
        }
        self.bills[cursor] = bill;
        Ok(())
    }

    /// Parse user input and use it as the current member's bill.
    pub fn enter_bill_for_current(&mut self, input: &str) -> Result<(), AllocationError> {
        self.collecting_cursor()?;
        let bill = parse_cents(input)?;
        self.set_bill_for_current(bill)
    }

    /// Confirm the current bill and move to the next member. On the last
    /// member this finishes entry instead.
    pub fn advance(&mut self) -> Result<(), AllocationError> {
        self.ensure_custom()?;
        match self.state {
            DraftState::Collecting { cursor, remaining } => {
                let remaining = remaining
                    .checked_sub(self.bills[cursor])
                    .ok_or(AllocationError::AmountOverflow)?;
                self.state = if cursor < self.last_index() {
                    DraftState::Collecting {
                        cursor: cursor + 1,
                        remaining,
                    }
                } else {
                    DraftState::ReadyToCommit { remaining }
                };
                Ok(())
            }
            DraftState::ReadyToCommit { .. } => Ok(()),
            DraftState::Committed => Err(AllocationError::AlreadyCommitted),
        }
    }

    /// Step back one member, giving the previous entry back to the remainder.
    /// Does nothing on the first member.
    pub fn retreat(&mut self) -> Result<(), AllocationError> {
        self.ensure_custom()?;
        match self.state {
            DraftState::Collecting { cursor: 0, .. } => Ok(()),
            DraftState::Collecting { cursor, remaining } => {
                self.state = DraftState::Collecting {
                    cursor: cursor - 1,
                    remaining: Self::give_back(remaining, self.bills[cursor - 1])?,
                };
                Ok(())
            }
            DraftState::ReadyToCommit { remaining } => {
                let last = self.last_index();
                self.state = DraftState::Collecting {
                    cursor: last,
                    remaining: Self::give_back(remaining, self.bills[last])?,
                };
                Ok(())
            }
            DraftState::Committed => Err(AllocationError::AlreadyCommitted),
        }
    }

    /// Record who paid the whole expense. Can be changed until commit.
    pub fn mark_paid_by(&mut self, member_id: MemberId) -> Result<(), AllocationError> {
        if self.is_committed() {
            return Err(AllocationError::AlreadyCommitted);
        }
        if self.position_of(member_id).is_none() {
            return Err(AllocationError::UnknownMember(member_id));
        }
        self.paid_by = Some(member_id);
        Ok(())
    }

    /// Mark the member under the cursor as the payer.
    pub fn mark_current_paid(&mut self) -> Result<MemberId, AllocationError> {
        let member_id = self
            .current_member()
            .map(|m| m.id)
            .ok_or(AllocationError::AlreadyCommitted)?;
        self.mark_paid_by(member_id)?;
        Ok(member_id)
    }

    /// Turn the draft into an expense. On failure the draft is left exactly
    /// as it was so the caller can correct it and retry.
    pub fn commit(&mut self) -> Result<Expense, AllocationError> {
        if self.is_committed() {
            return Err(AllocationError::AlreadyCommitted);
        }
        let outstanding = self.outstanding()?;
        if outstanding != 0 {
            return Err(AllocationError::NonZeroRemainder(outstanding));
        }
        let paid_by = self.paid_by.ok_or(AllocationError::NoPayer)?;

        let splits = self
            .members
            .iter()
            .zip(&self.bills)
            .map(|(member, &bill)| Split::new(member.id, bill))
            .collect();

        let mut expense = Expense::new(self.group_id, paid_by, self.total, splits);
        if let Some(desc) = &self.description {
            expense = expense.with_description(desc.clone());
        }

        self.state = DraftState::Committed;
        Ok(expense)
    }

    fn give_back(remaining: Cents, bill: Cents) -> Result<Cents, AllocationError> {
        remaining
            .checked_add(bill)
            .ok_or(AllocationError::AmountOverflow)
    }

    fn last_index(&self) -> usize {
        self.members.len() - 1
    }

    fn position_of(&self, member_id: MemberId) -> Option<usize> {
        self.members.iter().position(|m| m.id == member_id)
    }

    fn ensure_custom(&self) -> Result<(), AllocationError> {
        if self.strategy != SplitStrategy::Custom {
            return Err(AllocationError::NotEditable);
        }
        Ok(())
    }

    fn collecting_cursor(&self) -> Result<usize, AllocationError> {
        self.ensure_custom()?;
        match self.state {
            DraftState::Collecting { cursor, .. } => Ok(cursor),
            DraftState::ReadyToCommit { .. } => Err(AllocationError::NotCollecting),
            DraftState::Committed => Err(AllocationError::AlreadyCommitted),
        }
    }
}
