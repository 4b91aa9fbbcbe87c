use uuid::Uuid;

use crate::domain::{
    AllocationDraft, BalanceSheet, Cents, Expense, ExpenseId, ExpensePayload, ExpenseViolation,
    Group, GroupId, IntegrityWarning, Member, MemberId, Notice, SplitStrategy, build_notices,
    checked_sum, compute_net,
};
use crate::storage::{LedgerRows, Repository};

use super::{AppError, Notifier, NotifyError};

/// Application service providing the bill-splitting use cases.
/// This is the primary interface for any client (CLI, API, TUI, etc.).
pub struct SplitService {
    repo: Repository,
}

/// An expense with its payer and shares resolved to member names.
#[derive(Debug)]
pub struct ExpenseInfo {
    pub expense: Expense,
    pub payer_name: String,
    pub shares: Vec<ShareLine>,
}

#[derive(Debug)]
pub struct ShareLine {
    pub member_id: MemberId,
    pub name: String,
    pub bill: Cents,
}

/// Outcome of sending balance notices.
#[derive(Debug)]
pub struct NotificationReport {
    pub sheet: BalanceSheet,
    pub delivered: Vec<Notice>,
    pub failures: Vec<NotifyError>,
}

/// Result of re-validating a group's ledger.
pub struct LedgerCheck {
    pub group: Group,
    /// Every stored expense, readable or not
    pub expense_count: usize,
    /// Sum of readable expense totals; `None` if it does not fit in [`Cents`]
    pub total_spend: Option<Cents>,
    pub issues: Vec<IntegrityWarning>,
}

impl LedgerCheck {
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }
}

const UNKNOWN_MEMBER: &str = "(unknown)";

impl SplitService {
    /// Create a new split service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        tracing::debug!(database = database_path, "database initialized");
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    // ========================
    // Group operations
    // ========================

    /// Create a group. The creator is always the first member.
    pub async fn create_group(
        &self,
        name: String,
        creator: Member,
        others: Vec<Member>,
    ) -> Result<Group, AppError> {
        if self.repo.get_group_by_name(&name).await?.is_some() {
            return Err(AppError::GroupAlreadyExists(name));
        }

        let created_by = creator.id;
        let members = std::iter::once(creator).chain(others).collect();
        let group = Group::new(name, created_by, members)?;

        self.repo.save_group(&group).await?;
        tracing::info!(group = %group.name, members = group.members.len(), "group created");
        Ok(group)
    }

    /// Get a group by name or ID.
    pub async fn get_group(&self, reference: &str) -> Result<Group, AppError> {
        let found = match Uuid::parse_str(reference) {
            Ok(id) => self.repo.get_group(id).await?,
            Err(_) => self.repo.get_group_by_name(reference).await?,
        };
        found.ok_or_else(|| AppError::GroupNotFound(reference.to_string()))
    }

    pub async fn get_group_by_id(&self, id: GroupId) -> Result<Group, AppError> {
        self.repo
            .get_group(id)
            .await?
            .ok_or_else(|| AppError::GroupNotFound(id.to_string()))
    }

    /// List all groups.
    pub async fn list_groups(&self) -> Result<Vec<Group>, AppError> {
        Ok(self.repo.list_groups().await?)
    }

    /// Resolve a member of `group` by email.
    pub fn find_member<'g>(&self, group: &'g Group, email: &str) -> Result<&'g Member, AppError> {
        group
            .member_by_email(email)
            .ok_or_else(|| AppError::MemberNotFound {
                group: group.name.clone(),
                member: email.to_string(),
            })
    }

    // ========================
    // Expense operations
    // ========================

    /// Start splitting `total` across every member of a group.
    pub async fn begin_allocation(
        &self,
        group_reference: &str,
        total: Cents,
        strategy: SplitStrategy,
    ) -> Result<(Group, AllocationDraft), AppError> {
        let group = self.get_group(group_reference).await?;
        let draft = AllocationDraft::for_group(&group, total, strategy)?;
        Ok((group, draft))
    }

    /// Commit a draft and append the result to the ledger.
    ///
    /// The draft only moves to its committed state once the expense is
    /// stored; after any failure it can be corrected and committed again.
    pub async fn commit_allocation(
        &self,
        draft: &mut AllocationDraft,
    ) -> Result<Expense, AppError> {
        let mut attempt = draft.clone();
        let expense = attempt.commit()?;
        let stored = self.record_expense(expense).await?;
        *draft = attempt;
        Ok(stored)
    }

    /// Append an expense to its group's ledger after re-validating it.
    pub async fn record_expense(&self, mut expense: Expense) -> Result<Expense, AppError> {
        let group = self.get_group_by_id(expense.group_id).await?;
        expense.validate(&group)?;

        if self.repo.expense_exists(expense.id).await? {
            return Err(AppError::ExpenseAlreadyRecorded(expense.id.to_string()));
        }

        self.repo.append_expense(&mut expense).await?;
        tracing::info!(
            group = %group.name,
            expense = %expense.id,
            sequence = expense.sequence,
            total = expense.total,
            "expense recorded"
        );
        Ok(expense)
    }

    /// Record an expense received in wire form.
    pub async fn record_payload(&self, payload: ExpensePayload) -> Result<Expense, AppError> {
        self.record_expense(payload.into_expense()).await
    }

    /// List a group's readable expenses in ledger order.
    pub async fn list_expenses(&self, group_id: GroupId) -> Result<Vec<Expense>, AppError> {
        let (expenses, _) = self.load_ledger(group_id).await?;
        Ok(expenses)
    }

    /// Read a group's ledger, turning rows that cannot be decoded into
    /// integrity warnings.
    async fn load_ledger(
        &self,
        group_id: GroupId,
    ) -> Result<(Vec<Expense>, Vec<IntegrityWarning>), AppError> {
        let LedgerRows {
            expenses,
            unreadable,
        } = self.repo.list_expenses_for_group(group_id).await?;
        tracing::debug!(group = %group_id, count = expenses.len(), "expenses loaded");

        let warnings = unreadable
            .into_iter()
            .map(|row| {
                tracing::warn!(
                    group = %group_id,
                    expense = %row.id,
                    sequence = row.sequence,
                    "unreadable expense row: {}",
                    row.error
                );
                IntegrityWarning {
                    expense_id: Uuid::parse_str(&row.id).ok(),
                    sequence: row.sequence,
                    reason: ExpenseViolation::Unreadable(row.error),
                }
            })
            .collect();
        Ok((expenses, warnings))
    }

    pub async fn count_expenses(&self, group_id: GroupId) -> Result<i64, AppError> {
        Ok(self.repo.count_expenses_for_group(group_id).await?)
    }

    /// Expenses of a group with member names resolved.
    pub async fn expense_details(&self, group: &Group) -> Result<Vec<ExpenseInfo>, AppError> {
        let expenses = self.list_expenses(group.id).await?;
        Ok(expenses
            .into_iter()
            .map(|e| Self::describe(group, e))
            .collect())
    }

    /// Get a single expense with names resolved.
    pub async fn get_expense_info(&self, id: ExpenseId) -> Result<ExpenseInfo, AppError> {
        let expense = self
            .repo
            .get_expense(id)
            .await?
            .ok_or_else(|| AppError::ExpenseNotFound(id.to_string()))?;
        let group = self.get_group_by_id(expense.group_id).await?;
        Ok(Self::describe(&group, expense))
    }

    fn describe(group: &Group, expense: Expense) -> ExpenseInfo {
        let name_of = |id: MemberId| {
            group
                .member(id)
                .map(|m| m.name.clone())
                .unwrap_or_else(|| UNKNOWN_MEMBER.to_string())
        };

        let shares = expense
            .splits
            .iter()
            .map(|s| ShareLine {
                member_id: s.member_id,
                name: name_of(s.member_id),
                bill: s.bill,
            })
            .collect();

        ExpenseInfo {
            payer_name: name_of(expense.paid_by),
            shares,
            expense,
        }
    }

    // ========================
    // Balance operations
    // ========================

    /// Net balances of `perspective` against every other member of the group.
    pub async fn compute_net(
        &self,
        group_id: GroupId,
        perspective: MemberId,
    ) -> Result<BalanceSheet, AppError> {
        let group = self.get_group_by_id(group_id).await?;
        let (expenses, unreadable) = self.load_ledger(group_id).await?;
        let mut sheet = compute_net(&group, &expenses, perspective)?;

        sheet.warnings.extend(unreadable);
        sheet.warnings.sort_by_key(|w| w.sequence);
        for warning in &sheet.warnings {
            tracing::warn!(group = %group.name, "ledger integrity fault: {}", warning);
        }
        Ok(sheet)
    }

    /// Compute balances for `perspective` and send a notice to every
    /// counterparty. Failed deliveries are collected, not raised.
    pub async fn notify_balances<N: Notifier>(
        &self,
        group_id: GroupId,
        perspective: MemberId,
        notifier: &N,
    ) -> Result<NotificationReport, AppError> {
        let sheet = self.compute_net(group_id, perspective).await?;
        if sheet.balances.is_empty() {
            return Err(AppError::NothingToNotify(format!(
                "{} has no balances with anyone",
                sheet.perspective.name
            )));
        }

        let mut delivered = Vec::new();
        let mut failures = Vec::new();
        for notice in build_notices(&sheet) {
            match notifier.deliver(&notice) {
                Ok(()) => delivered.push(notice),
                Err(err) => {
                    tracing::warn!(to = %notice.to_email, "notification failed: {}", err);
                    failures.push(err);
                }
            }
        }

        Ok(NotificationReport {
            sheet,
            delivered,
            failures,
        })
    }

    // ========================
    // Integrity operations
    // ========================

    /// Re-validate every recorded expense of a group.
    pub async fn check_ledger(&self, group_id: GroupId) -> Result<LedgerCheck, AppError> {
        let group = self.get_group_by_id(group_id).await?;
        let (expenses, unreadable) = self.load_ledger(group_id).await?;
        let expense_count = expenses.len() + unreadable.len();

        let mut issues: Vec<IntegrityWarning> = expenses
            .iter()
            .filter_map(|e| {
                e.validate(&group).err().map(|reason| IntegrityWarning {
                    expense_id: Some(e.id),
                    sequence: e.sequence,
                    reason,
                })
            })
            .chain(unreadable)
            .collect();
        issues.sort_by_key(|w| w.sequence);

        Ok(LedgerCheck {
            expense_count,
            total_spend: checked_sum(expenses.iter().map(|e| e.total)),
            group,
            issues,
        })
    }
}
