use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::SplitService;
use crate::domain::{BalanceSheet, Expense, Group, MemberId, Standing, format_cents};

/// Snapshot of one group and its full ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub group: Group,
    pub expenses: Vec<Expense>,
}

/// Exporter for writing ledger data as CSV or JSON
pub struct Exporter<'a> {
    service: &'a SplitService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a SplitService) -> Self {
        Self { service }
    }

    /// Export a group's expenses to CSV, one row per split.
    pub async fn export_expenses_csv<W: Write>(&self, group: &Group, writer: W) -> Result<usize> {
        let expenses = self.service.list_expenses(group.id).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "expense_id",
            "sequence",
            "created_at",
            "description",
            "paid_by",
            "total",
            "member",
            "bill",
        ])?;

        let email_of = |id: MemberId| {
            group
                .member(id)
                .map(|m| m.email.clone())
                .unwrap_or_else(|| id.to_string())
        };

        let mut count = 0;
        for expense in &expenses {
            for split in &expense.splits {
                csv_writer.write_record([
                    expense.id.to_string(),
                    expense.sequence.to_string(),
                    expense.created_at.to_rfc3339(),
                    expense.description.clone().unwrap_or_default(),
                    email_of(expense.paid_by),
                    format_cents(expense.total),
                    email_of(split.member_id),
                    format_cents(split.bill),
                ])?;
            }
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export a balance sheet to CSV.
    pub fn export_balances_csv<W: Write>(&self, sheet: &BalanceSheet, writer: W) -> Result<usize> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(["name", "email", "net_bill", "standing"])?;

        for balance in &sheet.balances {
            let standing = match balance.standing() {
                Standing::OwesYou => "owes_you",
                Standing::YouOwe => "you_owe",
                Standing::Settled => "settled",
            };
            csv_writer.write_record([
                balance.name.as_str(),
                balance.email.as_str(),
                format_cents(balance.net_bill).as_str(),
                standing,
            ])?;
        }

        csv_writer.flush()?;
        Ok(sheet.balances.len())
    }

    /// Export a group and all of its expenses as pretty JSON.
    pub async fn export_group_json<W: Write>(
        &self,
        group: &Group,
        writer: W,
    ) -> Result<GroupSnapshot> {
        let snapshot = GroupSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            group: group.clone(),
            expenses: self.service.list_expenses(group.id).await?,
        };

        serde_json::to_writer_pretty(writer, &snapshot)?;
        Ok(snapshot)
    }
}
