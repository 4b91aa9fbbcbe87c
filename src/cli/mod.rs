mod prompt;

pub use prompt::*;

use std::collections::HashMap;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::application::{LogNotifier, SplitService};
use crate::config::{Config, DEFAULT_DATABASE};
use crate::domain::{
    AllocationDraft, BalanceSheet, Cents, Group, Member, SplitStrategy, Standing,
    format_abs_cents, format_cents, parse_cents,
};

/// SplitBill - split group expenses and see who owes whom
#[derive(Parser)]
#[command(name = "splitbill")]
#[command(about = "A local-first bill splitter backed by an append-only expense ledger")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "SPLITBILL_DB", default_value = DEFAULT_DATABASE)]
    pub database: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Write logs as JSON lines
    #[arg(long, global = true, env = "SPLITBILL_LOG_JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Group management commands
    #[command(subcommand)]
    Group(GroupCommands),

    /// Expense commands
    #[command(subcommand)]
    Expense(ExpenseCommands),

    /// Show one member's balances with everyone else in a group
    Balance {
        /// Group name or ID
        group: String,

        /// Email of the member whose balances to show
        #[arg(long = "as")]
        member: String,

        /// Output format: table, json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Send each counterparty a notice of their balance with a member
    Notify {
        /// Group name or ID
        group: String,

        /// Email of the member sending the notices
        #[arg(long = "as")]
        member: String,
    },

    /// Re-validate every expense recorded for a group
    Check {
        /// Group name or ID
        group: String,
    },

    /// Export data to CSV or JSON
    Export {
        /// What to export: expenses, balances, group
        export_type: String,

        /// Group name or ID
        group: String,

        /// Member email (required for balances)
        #[arg(long = "as")]
        member: Option<String>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Import expenses from a JSON array of expense payloads
    Import {
        /// Input file (stdin if omitted or "-")
        input: Option<String>,

        /// Validate without importing
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
pub enum GroupCommands {
    /// Create a new group
    Create {
        /// Group name (must be unique)
        name: String,

        /// The creating member, as "Name <email>"
        #[arg(long)]
        creator: String,

        /// Another member, as "Name <email>" (repeatable)
        #[arg(short, long = "member")]
        members: Vec<String>,
    },

    /// List all groups
    List,

    /// Show a group and its members
    Show {
        /// Group name or ID
        group: String,
    },
}

#[derive(Subcommand)]
pub enum ExpenseCommands {
    /// Split a new expense across the group and record it
    Add {
        /// Group name or ID
        group: String,

        /// Total spend (e.g., "90.00" or "90")
        total: String,

        /// How to split: equal, custom
        #[arg(short, long, default_value = "equal")]
        split: String,

        /// Email of the member who paid
        #[arg(long)]
        paid_by: Option<String>,

        /// A member's bill for a custom split, as email=amount (repeatable)
        #[arg(short, long = "bill")]
        bills: Vec<String>,

        /// Enter custom bills one member at a time
        #[arg(short, long)]
        interactive: bool,

        /// Description of the expense
        #[arg(short, long)]
        description: Option<String>,
    },

    /// List a group's expenses in the order they were recorded
    List {
        /// Group name or ID
        group: String,
    },

    /// Show detailed expense information
    Show {
        /// Expense ID
        id: String,
    },
}

impl Cli {
    /// Configuration assembled from flags and environment.
    pub fn config(&self) -> Config {
        Config {
            database: self.database.clone(),
            verbose: self.verbose,
            log_json: self.log_json,
        }
    }

    pub async fn run(self) -> Result<()> {
        let config = self.config();

        if matches!(self.command, Commands::Init) {
            SplitService::init(&config.database).await?;
            println!("Database initialized: {}", config.database);
            return Ok(());
        }

        let service = SplitService::connect(&config.database).await?;

        match self.command {
            Commands::Init => unreachable!("handled above"),

            Commands::Group(group_cmd) => run_group_command(&service, group_cmd).await?,

            Commands::Expense(expense_cmd) => run_expense_command(&service, expense_cmd).await?,

            Commands::Balance {
                group,
                member,
                format,
            } => run_balance_command(&service, &group, &member, &format).await?,

            Commands::Notify { group, member } => {
                let group = service.get_group(&group).await?;
                let perspective = service.find_member(&group, &member)?.id;
                let report = service
                    .notify_balances(group.id, perspective, &LogNotifier)
                    .await?;

                println!("Sent {} notice(s)", report.delivered.len());
                for notice in &report.delivered {
                    println!("  {:<28} {}", notice.to_email, notice.message);
                }
                if !report.failures.is_empty() {
                    println!("Failed to notify:");
                    for failure in &report.failures {
                        println!("  - {}", failure);
                    }
                    anyhow::bail!("{} notice(s) could not be sent", report.failures.len());
                }
            }

            Commands::Check { group } => run_check_command(&service, &group).await?,

            Commands::Export {
                export_type,
                group,
                member,
                output,
            } => {
                run_export_command(
                    &service,
                    &export_type,
                    &group,
                    member.as_deref(),
                    output.as_deref(),
                )
                .await?
            }

            Commands::Import { input, dry_run } => {
                run_import_command(&service, input.as_deref(), dry_run).await?
            }
        }

        Ok(())
    }
}

async fn run_group_command(service: &SplitService, cmd: GroupCommands) -> Result<()> {
    match cmd {
        GroupCommands::Create {
            name,
            creator,
            members,
        } => {
            let creator = parse_member(&creator)?;
            let others = members
                .iter()
                .map(|m| parse_member(m))
                .collect::<Result<Vec<_>>>()?;

            let group = service.create_group(name, creator, others).await?;
            println!(
                "Created group: {} ({} members, {})",
                group.name,
                group.members.len(),
                group.id
            );
        }

        GroupCommands::List => {
            let groups = service.list_groups().await?;
            if groups.is_empty() {
                println!("No groups found.");
            } else {
                println!(
                    "{:<24} {:>8} {:>9} {:<24}",
                    "NAME", "MEMBERS", "EXPENSES", "CREATED BY"
                );
                println!("{}", "-".repeat(68));
                for group in groups {
                    let expenses = service.count_expenses(group.id).await?;
                    let creator = group.creator().map(|m| m.name.as_str()).unwrap_or("?");
                    println!(
                        "{:<24} {:>8} {:>9} {:<24}",
                        truncate(&group.name, 24),
                        group.members.len(),
                        expenses,
                        truncate(creator, 24)
                    );
                }
            }
        }

        GroupCommands::Show { group } => {
            let group = service.get_group(&group).await?;
            println!("Group: {}", group.name);
            println!("  ID:      {}", group.id);
            println!(
                "  Created: {}",
                group.created_at.format("%Y-%m-%d %H:%M:%S")
            );
            println!("  Members:");
            for member in &group.members {
                let marker = if member.id == group.created_by {
                    " (creator)"
                } else {
                    ""
                };
                println!("    - {}{}", member, marker);
            }
        }
    }
    Ok(())
}

async fn run_expense_command(service: &SplitService, cmd: ExpenseCommands) -> Result<()> {
    match cmd {
        ExpenseCommands::Add {
            group,
            total,
            split,
            paid_by,
            bills,
            interactive,
            description,
        } => {
            let total = parse_cents(&total).context("Invalid total. Use '90.00' or '90'")?;
            let strategy: SplitStrategy = split.parse()?;
            let (group, mut draft) = service.begin_allocation(&group, total, strategy).await?;
            if let Some(desc) = description {
                draft = draft.with_description(desc);
            }
            if let Some(email) = &paid_by {
                draft.mark_paid_by(service.find_member(&group, email)?.id)?;
            }

            match strategy {
                SplitStrategy::Equal => {
                    if !bills.is_empty() || interactive {
                        anyhow::bail!("--bill and --interactive only apply to a custom split");
                    }
                }
                SplitStrategy::Custom if interactive => {
                    let stdin = std::io::stdin();
                    let outcome =
                        prompt_custom_split(&mut draft, stdin.lock(), std::io::stdout())?;
                    if outcome == PromptOutcome::Abandoned {
                        println!("Expense abandoned; nothing recorded.");
                        return Ok(());
                    }
                }
                SplitStrategy::Custom => fill_custom_bills(&group, &mut draft, &bills)?,
            }

            let expense = service.commit_allocation(&mut draft).await?;
            let payer = group
                .member(expense.paid_by)
                .map(|m| m.name.as_str())
                .unwrap_or("?");

            println!(
                "Recorded expense: {} paid by {} ({})",
                format_cents(expense.total),
                payer,
                expense.id
            );
            for split in &expense.splits {
                if let Some(member) = group.member(split.member_id) {
                    println!("  {:<20} {:>10}", member.name, format_cents(split.bill));
                }
            }
        }

        ExpenseCommands::List { group } => {
            let group = service.get_group(&group).await?;
            let details = service.expense_details(&group).await?;

            if details.is_empty() {
                println!("No expenses found.");
            } else {
                println!(
                    "{:<5} {:<12} {:>10} {:<15} DESCRIPTION",
                    "#", "DATE", "TOTAL", "PAID BY"
                );
                println!("{}", "-".repeat(70));
                for info in &details {
                    let expense = &info.expense;
                    println!(
                        "{:<5} {:<12} {:>10} {:<15} {}",
                        expense.sequence,
                        expense.created_at.format("%Y-%m-%d"),
                        format_cents(expense.total),
                        truncate(&info.payer_name, 15),
                        truncate(expense.description.as_deref().unwrap_or(""), 30)
                    );
                    for share in &info.shares {
                        println!(
                            "{:>20} {:<15} {:>10}",
                            "",
                            truncate(&share.name, 15),
                            format_cents(share.bill)
                        );
                    }
                }
            }
        }

        ExpenseCommands::Show { id } => {
            let expense_id =
                Uuid::parse_str(&id).context("Invalid expense ID format (expected UUID)")?;
            let info = service.get_expense_info(expense_id).await?;
            let expense = &info.expense;

            println!("Expense: {}", expense.id);
            println!("  Sequence:    {}", expense.sequence);
            println!(
                "  Created:     {}",
                expense.created_at.format("%Y-%m-%d %H:%M:%S")
            );
            println!("  Total:       {}", format_cents(expense.total));
            println!("  Paid by:     {}", info.payer_name);
            if let Some(desc) = &expense.description {
                println!("  Description: {}", desc);
            }
            println!(
                "  Recorded at: {}",
                expense.recorded_at.format("%Y-%m-%d %H:%M:%S")
            );
            println!();
            println!("  Splits:");
            for share in &info.shares {
                println!("    {:<20} {:>10}", share.name, format_cents(share.bill));
            }
        }
    }
    Ok(())
}

/// Drive a custom draft from `email=amount` pairs, in member order.
/// Members without a pair owe nothing.
fn fill_custom_bills(group: &Group, draft: &mut AllocationDraft, bills: &[String]) -> Result<()> {
    let mut by_member: HashMap<Uuid, &str> = HashMap::new();
    for pair in bills {
        let (email, amount) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("Invalid --bill '{}'. Use email=amount", pair))?;
        let member = group.member_by_email(email).ok_or_else(|| {
            anyhow::anyhow!("'{}' is not a member of group '{}'", email, group.name)
        })?;
        if by_member.insert(member.id, amount).is_some() {
            anyhow::bail!("More than one --bill given for {}", member.email);
        }
    }

    for member in &group.members {
        if let Some(amount) = by_member.get(&member.id) {
            draft
                .enter_bill_for_current(amount)
                .with_context(|| format!("Bill for {}", member.email))?;
        }
        draft.advance()?;
    }
    Ok(())
}

async fn run_balance_command(
    service: &SplitService,
    group: &str,
    member: &str,
    format: &str,
) -> Result<()> {
    let group = service.get_group(group).await?;
    let perspective = service.find_member(&group, member)?.id;
    let sheet = service.compute_net(group.id, perspective).await?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&sheet)?),
        "csv" => {
            let exporter = crate::io::Exporter::new(service);
            exporter.export_balances_csv(&sheet, std::io::stdout())?;
        }
        _ => print_balance_table(&group, &sheet),
    }
    Ok(())
}

fn print_balance_table(group: &Group, sheet: &BalanceSheet) {
    println!("Balances for {} in {}", sheet.perspective.name, group.name);
    println!();

    if sheet.balances.is_empty() {
        println!("No shared expenses yet.");
    } else {
        println!("{:<20} {:<28} {:>12}  STATUS", "NAME", "EMAIL", "AMOUNT");
        println!("{}", "-".repeat(74));
        for balance in &sheet.balances {
            let status = match balance.standing() {
                Standing::OwesYou => "owes you",
                Standing::YouOwe => "you owe",
                Standing::Settled => "settled",
            };
            println!(
                "{:<20} {:<28} {:>12}  {}",
                truncate(&balance.name, 20),
                truncate(&balance.email, 28),
                format_abs_cents(balance.net_bill),
                status
            );
        }
        println!("{}", "-".repeat(74));
        println!(
            "Owed to you: {}   You owe: {}",
            format_total(sheet.total_owed_to_perspective()),
            format_total(sheet.total_owed_by_perspective())
        );
    }

    if !sheet.warnings.is_empty() {
        println!();
        println!("Warning: some expenses were left out:");
        for warning in &sheet.warnings {
            println!("  - {}", warning);
        }
    }
}

async fn run_check_command(service: &SplitService, group: &str) -> Result<()> {
    let group = service.get_group(group).await?;
    println!("Checking ledger for {}...\n", group.name);

    let check = service.check_ledger(group.id).await?;
    println!("Members:     {}", check.group.members.len());
    println!("Expenses:    {}", check.expense_count);
    println!("Total spend: {}", format_total(check.total_spend));
    println!();

    if check.is_healthy() {
        println!("Ledger is consistent.");
    } else {
        println!("Issues found:");
        for issue in &check.issues {
            println!("  - {}", issue);
        }
        anyhow::bail!("Ledger integrity check failed");
    }
    Ok(())
}

async fn run_export_command(
    service: &SplitService,
    export_type: &str,
    group: &str,
    member: Option<&str>,
    output: Option<&str>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{Write, stdout};

    let exporter = Exporter::new(service);
    let group = service.get_group(group).await?;

    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    match export_type {
        "expenses" => {
            let count = exporter.export_expenses_csv(&group, writer).await?;
            if output.is_some() {
                eprintln!("Exported {} expenses", count);
            }
        }
        "balances" => {
            let email = member.context("--as <email> is required to export balances")?;
            let perspective = service.find_member(&group, email)?.id;
            let sheet = service.compute_net(group.id, perspective).await?;
            let count = exporter.export_balances_csv(&sheet, writer)?;
            if output.is_some() {
                eprintln!("Exported {} balances", count);
            }
        }
        "group" => {
            let snapshot = exporter.export_group_json(&group, writer).await?;
            if output.is_some() {
                eprintln!(
                    "Exported group {}: {} members, {} expenses",
                    snapshot.group.name,
                    snapshot.group.members.len(),
                    snapshot.expenses.len()
                );
            }
        }
        _ => {
            anyhow::bail!(
                "Invalid export type '{}'. Valid types: expenses, balances, group",
                export_type
            );
        }
    }

    Ok(())
}

async fn run_import_command(
    service: &SplitService,
    input: Option<&str>,
    dry_run: bool,
) -> Result<()> {
    use crate::io::{ImportOptions, Importer};
    use std::fs::File;
    use std::io::{Read, stdin};

    let reader: Box<dyn Read> = match input {
        Some(path) if path != "-" => {
            let file =
                File::open(path).with_context(|| format!("Failed to open input file: {}", path))?;
            Box::new(file)
        }
        _ => Box::new(stdin()),
    };

    let importer = Importer::new(service);
    let result = importer
        .import_payloads_json(reader, ImportOptions { dry_run })
        .await?;

    if dry_run {
        println!("Validation complete");
    } else {
        println!("Import complete");
    }
    println!("  Imported: {}", result.imported);
    println!("  Errors:   {}", result.errors.len());

    if !result.errors.is_empty() {
        println!("\nErrors:");
        for error in result.errors.iter().take(10) {
            println!("  Record {}: {}", error.index, error.error);
        }
        if result.errors.len() > 10 {
            println!("  ... and {} more errors", result.errors.len() - 10);
        }
    }

    Ok(())
}

fn parse_member(input: &str) -> Result<Member> {
    Member::parse_contact(input).ok_or_else(|| {
        anyhow::anyhow!(
            "Invalid member '{}'. Use \"Name <email>\" or an email address",
            input
        )
    })
}

fn format_total(total: Option<Cents>) -> String {
    total.map_or_else(|| "out of range".to_string(), format_cents)
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}
