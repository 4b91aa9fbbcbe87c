use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::domain::{Expense, ExpenseId, Group, GroupId, Member, Split};

use super::{MIGRATION_001_INITIAL, MIGRATION_002_EXPENSES};

const EXPENSE_COLUMNS: &str =
    "id, sequence, group_id, paid_by, total_cents, description, created_at, recorded_at";

/// A stored expense row that could not be decoded.
#[derive(Debug, Clone)]
pub struct UnreadableExpense {
    /// Raw id column, as stored
    pub id: String,
    pub sequence: i64,
    pub error: String,
}

/// A group's ledger as read back from storage.
#[derive(Debug, Default)]
pub struct LedgerRows {
    /// Decoded expenses, in append order
    pub expenses: Vec<Expense>,
    pub unreadable: Vec<UnreadableExpense>,
}

/// Repository for persisting groups and their append-only expense ledger.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;

        sqlx::query(MIGRATION_002_EXPENSES)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 002")?;

        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Group operations
    // ========================

    /// Save a group together with its members.
    pub async fn save_group(&self, group: &Group) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        sqlx::query("INSERT INTO groups (id, name, created_by, created_at) VALUES (?, ?, ?, ?)")
            .bind(group.id.to_string())
            .bind(&group.name)
            .bind(group.created_by.to_string())
            .bind(group.created_at.to_rfc3339())
            .execute(&mut *tx)
            .await
            .context("Failed to save group")?;

        for (position, member) in group.members.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO group_members (group_id, member_id, position, name, email)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(group.id.to_string())
            .bind(member.id.to_string())
            .bind(position as i64)
            .bind(&member.name)
            .bind(&member.email)
            .execute(&mut *tx)
            .await
            .context("Failed to save group member")?;
        }

        tx.commit().await.context("Failed to commit group")?;
        Ok(())
    }

    /// Get a group by ID.
    pub async fn get_group(&self, id: GroupId) -> Result<Option<Group>> {
        let row = sqlx::query("SELECT id, name, created_by, created_at FROM groups WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch group")?;

        match row {
            Some(row) => Ok(Some(self.load_group(&row).await?)),
            None => Ok(None),
        }
    }

    /// Get a group by name.
    pub async fn get_group_by_name(&self, name: &str) -> Result<Option<Group>> {
        let row = sqlx::query("SELECT id, name, created_by, created_at FROM groups WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch group by name")?;

        match row {
            Some(row) => Ok(Some(self.load_group(&row).await?)),
            None => Ok(None),
        }
    }

    /// List all groups, ordered by name.
    pub async fn list_groups(&self) -> Result<Vec<Group>> {
        let rows = sqlx::query("SELECT id, name, created_by, created_at FROM groups ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list groups")?;

        let mut groups = Vec::with_capacity(rows.len());
        for row in &rows {
            groups.push(self.load_group(row).await?);
        }
        Ok(groups)
    }

    async fn load_group(&self, row: &SqliteRow) -> Result<Group> {
        let id_str: String = row.get("id");
        let created_by_str: String = row.get("created_by");
        let created_at_str: String = row.get("created_at");

        let member_rows = sqlx::query(
            r#"
            SELECT member_id, name, email
            FROM group_members
            WHERE group_id = ?
            ORDER BY position
            "#,
        )
        .bind(&id_str)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch group members")?;

        let members = member_rows
            .iter()
            .map(|r| {
                let member_id: String = r.get("member_id");
                Ok(Member {
                    id: Uuid::parse_str(&member_id).context("Invalid member ID")?,
                    name: r.get("name"),
                    email: r.get("email"),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Group {
            id: Uuid::parse_str(&id_str).context("Invalid group ID")?,
            name: row.get("name"),
            created_by: Uuid::parse_str(&created_by_str).context("Invalid creator ID")?,
            members,
            created_at: parse_timestamp(&created_at_str).context("Invalid created_at")?,
        })
    }

    // ========================
    // Ledger operations
    // ========================

    /// Append an expense and all of its splits in one transaction.
    /// Assigns the next sequence number; nothing is written if any step fails.
    pub async fn append_expense(&self, expense: &mut Expense) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let sequence = Self::next_sequence(&mut tx).await?;
        let recorded_at = Utc::now();

        sqlx::query(&format!(
            "INSERT INTO expenses ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            EXPENSE_COLUMNS
        ))
        .bind(expense.id.to_string())
        .bind(sequence)
        .bind(expense.group_id.to_string())
        .bind(expense.paid_by.to_string())
        .bind(expense.total)
        .bind(&expense.description)
        .bind(expense.created_at.to_rfc3339())
        .bind(recorded_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .context("Failed to save expense")?;

        for (position, split) in expense.splits.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO expense_splits (expense_id, position, member_id, bill_cents)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(expense.id.to_string())
            .bind(position as i64)
            .bind(split.member_id.to_string())
            .bind(split.bill)
            .execute(&mut *tx)
            .await
            .context("Failed to save expense split")?;
        }

        tx.commit().await.context("Failed to commit expense")?;

        expense.sequence = sequence;
        expense.recorded_at = recorded_at;
        Ok(())
    }

    /// Get the next sequence number and increment the counter.
    async fn next_sequence(conn: &mut SqliteConnection) -> Result<i64> {
        let row = sqlx::query(
            r#"
            UPDATE sequence_counter
            SET value = value + 1
            WHERE name = 'expense_sequence'
            RETURNING value
            "#,
        )
        .fetch_one(conn)
        .await
        .context("Failed to get next sequence number")?;

        Ok(row.get("value"))
    }

    /// Whether an expense with this ID has already been recorded.
    pub async fn expense_exists(&self, id: ExpenseId) -> Result<bool> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM expenses WHERE id = ?")
            .bind(id.to_string())
            .fetch_one(&self.pool)
            .await
            .context("Failed to check expense")?;

        Ok(row.get::<i64, _>("count") > 0)
    }

    /// Get an expense by ID.
    pub async fn get_expense(&self, id: ExpenseId) -> Result<Option<Expense>> {
        let row = sqlx::query(&format!("SELECT {} FROM expenses WHERE id = ?", EXPENSE_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch expense")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let split_rows = sqlx::query(
            r#"
            SELECT expense_id, member_id, bill_cents
            FROM expense_splits
            WHERE expense_id = ?
            ORDER BY position
            "#,
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch expense splits")?;

        let split_rows: Vec<_> = split_rows.iter().collect();
        Self::decode_expense(&row, &split_rows).map(Some)
    }

    /// List a group's expenses in the order they were appended.
    ///
    /// Rows that cannot be decoded are returned separately so that one bad
    /// record does not hide the rest of the ledger.
    pub async fn list_expenses_for_group(&self, group_id: GroupId) -> Result<LedgerRows> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM expenses WHERE group_id = ? ORDER BY sequence",
            EXPENSE_COLUMNS
        ))
        .bind(group_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list expenses")?;

        let split_rows = sqlx::query(
            r#"
            SELECT s.expense_id, s.member_id, s.bill_cents
            FROM expense_splits s
            JOIN expenses e ON e.id = s.expense_id
            WHERE e.group_id = ?
            ORDER BY e.sequence, s.position
            "#,
        )
        .bind(group_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list expense splits")?;

        let mut splits_by_expense: HashMap<String, Vec<&SqliteRow>> = HashMap::new();
        for row in &split_rows {
            let expense_id: String = row.try_get("expense_id").unwrap_or_default();
            splits_by_expense.entry(expense_id).or_default().push(row);
        }

        let mut ledger = LedgerRows::default();
        for row in &rows {
            let id: String = row.try_get("id").unwrap_or_default();
            let splits = splits_by_expense.remove(&id).unwrap_or_default();
            match Self::decode_expense(row, &splits) {
                Ok(expense) => ledger.expenses.push(expense),
                Err(err) => ledger.unreadable.push(UnreadableExpense {
                    id,
                    sequence: row.try_get("sequence").unwrap_or_default(),
                    error: format!("{:#}", err),
                }),
            }
        }
        Ok(ledger)
    }

    /// Count expenses recorded for a group.
    pub async fn count_expenses_for_group(&self, group_id: GroupId) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM expenses WHERE group_id = ?")
            .bind(group_id.to_string())
            .fetch_one(&self.pool)
            .await
            .context("Failed to count expenses")?;

        Ok(row.get("count"))
    }

    fn decode_expense(row: &SqliteRow, split_rows: &[&SqliteRow]) -> Result<Expense> {
        let id_str: String = row.try_get("id").context("Unreadable expense ID")?;
        let group_id_str: String = row.try_get("group_id").context("Unreadable group ID")?;
        let paid_by_str: String = row.try_get("paid_by").context("Unreadable payer ID")?;
        let created_at_str: String = row.try_get("created_at").context("Unreadable created_at")?;
        let recorded_at_str: String =
            row.try_get("recorded_at").context("Unreadable recorded_at")?;

        let splits = split_rows
            .iter()
            .map(|r| {
                let member_id: String = r.try_get("member_id").context("Unreadable split member")?;
                Ok(Split {
                    member_id: Uuid::parse_str(&member_id).context("Invalid split member ID")?,
                    bill: r.try_get("bill_cents").context("Unreadable split bill")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Expense {
            id: Uuid::parse_str(&id_str).context("Invalid expense ID")?,
            sequence: row.try_get("sequence").context("Unreadable sequence")?,
            group_id: Uuid::parse_str(&group_id_str).context("Invalid group ID")?,
            paid_by: Uuid::parse_str(&paid_by_str).context("Invalid payer ID")?,
            total: row.try_get("total_cents").context("Unreadable total")?,
            splits,
            description: row.try_get("description").context("Unreadable description")?,
            created_at: parse_timestamp(&created_at_str).context("Invalid created_at")?,
            recorded_at: parse_timestamp(&recorded_at_str).context("Invalid recorded_at")?,
        })
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}
