use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::application::{ExpenseDraft, ParticipantDraft, SplitService};
use crate::domain::{
    format_amount, parse_amount, split_evenly, ExpenseCategory, ExpenseLine, ParticipantId,
    SettleScope, TripId,
};

/// Tripsplit - Shared Trip Expenses
#[derive(Parser)]
#[command(name = "tripsplit")]
#[command(about = "A local-first shared-expense tracker that settles trip debts from the command line")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "tripsplit.db")]
    pub database: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Trip management commands
    #[command(subcommand)]
    Trip(TripCommands),

    /// Participant management commands
    #[command(subcommand)]
    Participant(ParticipantCommands),

    /// Expense management commands
    #[command(subcommand)]
    Expense(ExpenseCommands),

    /// Compute who owes whom for a trip
    Settle {
        /// Trip ID
        trip_id: TripId,

        /// Include expenses already marked settled
        #[arg(long)]
        all: bool,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Per-category spending breakdown for a trip
    Stats {
        /// Trip ID
        trip_id: TripId,
    },

    /// Export trip data to CSV or JSON
    Export {
        /// What to export: expenses, balances, transfers, settlement
        export_type: String,

        /// Trip ID
        trip_id: TripId,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Include expenses already marked settled
        #[arg(long)]
        all: bool,
    },
}

#[derive(Subcommand)]
pub enum TripCommands {
    /// Create a new trip with its participants
    Create {
        /// Trip name
        name: String,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: String,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: String,

        /// Name of the trip owner
        #[arg(long)]
        owner: String,

        /// Additional participant name (repeat for each person)
        #[arg(short, long = "participant")]
        participants: Vec<String>,
    },

    /// List all trips
    List,

    /// Show detailed trip information
    Show {
        /// Trip ID
        trip_id: TripId,
    },

    /// Delete a trip (soft delete)
    Delete {
        /// Trip ID
        trip_id: TripId,
    },

    /// Change a trip's date range
    SetDates {
        /// Trip ID
        trip_id: TripId,

        /// New start date (YYYY-MM-DD)
        #[arg(long)]
        start: String,

        /// New end date (YYYY-MM-DD)
        #[arg(long)]
        end: String,
    },
}

#[derive(Subcommand)]
pub enum ParticipantCommands {
    /// Add a participant to a trip
    Add {
        /// Trip ID
        trip_id: TripId,

        /// Participant name
        name: String,

        /// Phone number
        #[arg(long)]
        phone: Option<String>,

        /// Email address
        #[arg(long)]
        email: Option<String>,
    },

    /// Remove a participant from a trip (soft delete)
    Remove {
        /// Trip ID
        trip_id: TripId,

        /// Participant ID
        participant_id: ParticipantId,
    },
}

#[derive(Subcommand)]
pub enum ExpenseCommands {
    /// Record a new expense
    Add {
        /// Trip ID
        trip_id: TripId,

        /// Expense title
        title: String,

        /// Total amount (e.g., "45000" or "45,000")
        #[arg(short, long)]
        amount: String,

        /// Category: food, accommodation, transport, entertainment, shopping, other
        #[arg(short, long, default_value = "other")]
        category: String,

        /// Date of the expense (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// Currency code
        #[arg(long)]
        currency: Option<String>,

        /// Who paid, as ID=AMOUNT (repeat for each payer)
        #[arg(long = "paid")]
        paid: Vec<String>,

        /// Who owes, as ID=AMOUNT (repeat for each share)
        #[arg(long = "share")]
        shares: Vec<String>,

        /// Split the total evenly among these participant IDs (e.g., "1,2,3")
        #[arg(long)]
        among: Option<String>,
    },

    /// Replace an expense's details and lines
    Edit {
        /// Expense ID
        expense_id: i64,

        /// New title
        title: String,

        /// Total amount (e.g., "45000" or "45,000")
        #[arg(short, long)]
        amount: String,

        /// Category: food, accommodation, transport, entertainment, shopping, other
        #[arg(short, long, default_value = "other")]
        category: String,

        /// Date of the expense (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// Currency code
        #[arg(long)]
        currency: Option<String>,

        /// Who paid, as ID=AMOUNT (repeat for each payer)
        #[arg(long = "paid")]
        paid: Vec<String>,

        /// Who owes, as ID=AMOUNT (repeat for each share)
        #[arg(long = "share")]
        shares: Vec<String>,

        /// Split the total evenly among these participant IDs (e.g., "1,2,3")
        #[arg(long)]
        among: Option<String>,
    },

    /// Delete an expense (soft delete)
    Delete {
        /// Expense ID
        expense_id: i64,
    },

    /// Mark an expense settled, or reopen it
    Settle {
        /// Expense ID
        expense_id: i64,

        /// Reopen instead of settling
        #[arg(long)]
        undo: bool,
    },

    /// List a trip's expenses
    List {
        /// Trip ID
        trip_id: TripId,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        init_logging(self.verbose);

        match self.command {
            Commands::Init => {
                SplitService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Trip(trip_cmd) => {
                let service = SplitService::connect(&self.database).await?;
                run_trip_command(&service, trip_cmd).await?;
            }

            Commands::Participant(participant_cmd) => {
                let service = SplitService::connect(&self.database).await?;
                run_participant_command(&service, participant_cmd).await?;
            }

            Commands::Expense(expense_cmd) => {
                let service = SplitService::connect(&self.database).await?;
                run_expense_command(&service, expense_cmd).await?;
            }

            Commands::Settle {
                trip_id,
                all,
                format,
            } => {
                let service = SplitService::connect(&self.database).await?;
                run_settle_command(&service, trip_id, all, &format).await?;
            }

            Commands::Stats { trip_id } => {
                let service = SplitService::connect(&self.database).await?;
                run_stats_command(&service, trip_id).await?;
            }

            Commands::Export {
                export_type,
                trip_id,
                output,
                all,
            } => {
                let service = SplitService::connect(&self.database).await?;
                run_export_command(&service, &export_type, trip_id, output.as_deref(), all).await?;
            }
        }

        Ok(())
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("tripsplit=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tripsplit=info"))
    };

    // Diagnostics go to stderr; stdout carries only command output, so
    // redirected JSON and CSV stay parseable.
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

async fn run_trip_command(service: &SplitService, cmd: TripCommands) -> Result<()> {
    match cmd {
        TripCommands::Create {
            name,
            start,
            end,
            owner,
            participants,
        } => {
            let start_date = parse_date(&start)?;
            let end_date = parse_date(&end)?;

            let mut drafts = vec![ParticipantDraft {
                name: owner.clone(),
                phone: None,
                email: None,
                is_owner: true,
            }];
            for participant in participants.into_iter().filter(|p| p != &owner) {
                drafts.push(ParticipantDraft {
                    name: participant,
                    phone: None,
                    email: None,
                    is_owner: false,
                });
            }

            let snapshot = service
                .create_trip(name, start_date, end_date, drafts)
                .await?;
            println!(
                "Created trip: {} (#{}, {} participants)",
                snapshot.trip.name,
                snapshot.trip.id,
                snapshot.participants.len()
            );
            for participant in &snapshot.participants {
                println!(
                    "  #{} {}{}",
                    participant.id,
                    participant.name,
                    if participant.is_owner { " (owner)" } else { "" }
                );
            }
        }

        TripCommands::List => {
            let trips = service.list_trips().await?;
            if trips.is_empty() {
                println!("No trips found.");
            } else {
                println!("{:<6} {:<24} {:<12} {:<12}", "ID", "NAME", "START", "END");
                println!("{}", "-".repeat(58));
                for trip in trips {
                    println!(
                        "{:<6} {:<24} {:<12} {:<12}",
                        trip.id,
                        truncate(&trip.name, 24),
                        trip.start_date.to_string(),
                        trip.end_date.to_string()
                    );
                }
            }
        }

        TripCommands::Show { trip_id } => {
            run_show_trip_command(service, trip_id).await?;
        }

        TripCommands::Delete { trip_id } => {
            let trip = service.delete_trip(trip_id).await?;
            println!("Deleted trip: {}", trip.name);
        }

        TripCommands::SetDates {
            trip_id,
            start,
            end,
        } => {
            let start_date = parse_date(&start)?;
            let end_date = parse_date(&end)?;
            let trip = service
                .update_trip_dates(trip_id, start_date, end_date)
                .await?;
            println!(
                "Updated trip dates: {} ({} to {})",
                trip.name, trip.start_date, trip.end_date
            );
        }
    }
    Ok(())
}

async fn run_show_trip_command(service: &SplitService, trip_id: TripId) -> Result<()> {
    let snapshot = service.get_trip(trip_id).await?;
    let trip = &snapshot.trip;

    println!("Trip: {} (#{})", trip.name, trip.id);
    println!("  Dates:   {} to {}", trip.start_date, trip.end_date);
    println!(
        "  Created: {}",
        trip.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    if !trip.active {
        println!("  Status:  deleted");
    }
    println!();

    println!("Participants:");
    for participant in snapshot.active_participants() {
        let mut line = format!("  #{} {}", participant.id, participant.name);
        if participant.is_owner {
            line.push_str(" (owner)");
        }
        if let Some(phone) = &participant.phone {
            line.push_str(&format!(" {}", phone));
        }
        if let Some(email) = &participant.email {
            line.push_str(&format!(" <{}>", email));
        }
        println!("{}", line);
    }

    let active: Vec<_> = snapshot.expenses.iter().filter(|e| e.active).collect();
    let settled = active.iter().filter(|e| e.settled).count();
    let total: i64 = active.iter().map(|e| e.total_amount).sum();

    println!();
    println!(
        "Expenses: {} ({} settled), total {}",
        active.len(),
        settled,
        format_amount(total)
    );

    Ok(())
}

async fn run_participant_command(service: &SplitService, cmd: ParticipantCommands) -> Result<()> {
    match cmd {
        ParticipantCommands::Add {
            trip_id,
            name,
            phone,
            email,
        } => {
            let draft = ParticipantDraft {
                name,
                phone,
                email,
                is_owner: false,
            };
            let participant = service.add_participant(trip_id, draft).await?;
            println!(
                "Added participant: {} (#{})",
                participant.name, participant.id
            );
        }

        ParticipantCommands::Remove {
            trip_id,
            participant_id,
        } => {
            let participant = service.remove_participant(trip_id, participant_id).await?;
            println!("Removed participant: {}", participant.name);
        }
    }
    Ok(())
}

async fn run_expense_command(service: &SplitService, cmd: ExpenseCommands) -> Result<()> {
    match cmd {
        ExpenseCommands::Add {
            trip_id,
            title,
            amount,
            category,
            date,
            currency,
            paid,
            shares,
            among,
        } => {
            let draft = build_expense_draft(
                title,
                &amount,
                &category,
                date.as_deref(),
                currency,
                &paid,
                &shares,
                among.as_deref(),
            )?;
            let expense = service.record_expense(trip_id, draft).await?;
            println!(
                "Recorded expense: {} {} (#{})",
                expense.title,
                format_amount(expense.total_amount),
                expense.id
            );
        }

        ExpenseCommands::Edit {
            expense_id,
            title,
            amount,
            category,
            date,
            currency,
            paid,
            shares,
            among,
        } => {
            let draft = build_expense_draft(
                title,
                &amount,
                &category,
                date.as_deref(),
                currency,
                &paid,
                &shares,
                among.as_deref(),
            )?;
            let expense = service.update_expense(expense_id, draft).await?;
            println!("Updated expense: {} (#{})", expense.title, expense.id);
        }

        ExpenseCommands::Delete { expense_id } => {
            let expense = service.delete_expense(expense_id).await?;
            println!("Deleted expense: {}", expense.title);
        }

        ExpenseCommands::Settle { expense_id, undo } => {
            let expense = service.set_expense_settled(expense_id, !undo).await?;
            if undo {
                println!("Reopened expense: {}", expense.title);
            } else {
                println!("Settled expense: {}", expense.title);
            }
        }

        ExpenseCommands::List { trip_id } => {
            let expenses = service.list_expenses(trip_id).await?;
            if expenses.is_empty() {
                println!("No expenses found.");
            } else {
                println!(
                    "{:<6} {:<12} {:<24} {:<14} {:>12} {:<8}",
                    "ID", "DATE", "TITLE", "CATEGORY", "AMOUNT", "SETTLED"
                );
                println!("{}", "-".repeat(80));
                for expense in expenses {
                    println!(
                        "{:<6} {:<12} {:<24} {:<14} {:>12} {:<8}",
                        expense.id,
                        expense.occurred_at.format("%Y-%m-%d").to_string(),
                        truncate(&expense.title, 24),
                        expense.category.as_str(),
                        format_amount(expense.total_amount),
                        if expense.settled { "yes" } else { "" }
                    );
                }
            }
        }
    }
    Ok(())
}

async fn run_settle_command(
    service: &SplitService,
    trip_id: TripId,
    all: bool,
    format: &str,
) -> Result<()> {
    if !matches!(format, "table" | "json") {
        anyhow::bail!("Invalid format '{}'. Valid formats: table, json", format);
    }

    let scope = if all {
        SettleScope::All
    } else {
        SettleScope::Unsettled
    };
    let report = service.compute_settlement(trip_id, scope).await?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let snapshot = service.get_trip(trip_id).await?;
    println!("Settlement for trip: {}", snapshot.trip.name);
    println!("Scope: {} expenses", scope.as_str());
    println!("Total: {}", format_amount(report.total_expense));
    println!();

    println!("{:<20} {:>12} {:>12} {:>12}", "NAME", "PAID", "OWED", "NET");
    println!("{}", "-".repeat(60));
    for balance in &report.balances {
        println!(
            "{:<20} {:>12} {:>12} {:>12}",
            truncate(&balance.name, 20),
            format_amount(balance.paid),
            format_amount(balance.owed),
            format_amount(balance.net)
        );
    }

    println!();
    if report.transfers.is_empty() {
        println!("Nothing to settle.");
    } else {
        println!("Transfers:");
        for transfer in &report.transfers {
            println!(
                "  {} -> {}: {}",
                transfer.from_name,
                transfer.to_name,
                format_amount(transfer.amount)
            );
        }
    }

    Ok(())
}

async fn run_stats_command(service: &SplitService, trip_id: TripId) -> Result<()> {
    let stats = service.trip_statistics(trip_id).await?;

    println!("Spending by category: {}", stats.trip_name);
    println!();

    if stats.categories.is_empty() {
        println!("No expenses recorded.");
        return Ok(());
    }

    println!(
        "{:<16} {:>12} {:>8} {:>8}",
        "CATEGORY", "TOTAL", "COUNT", "PERCENT"
    );
    println!("{}", "-".repeat(48));
    for stat in &stats.categories {
        println!(
            "{:<16} {:>12} {:>8} {:>7.1}%",
            stat.category.as_str(),
            format_amount(stat.total),
            stat.count,
            stat.percentage
        );
    }
    println!("{}", "-".repeat(48));
    println!("{:<16} {:>12}", "TOTAL", format_amount(stats.total_expense));

    Ok(())
}

async fn run_export_command(
    service: &SplitService,
    export_type: &str,
    trip_id: TripId,
    output: Option<&str>,
    all: bool,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{stdout, Write};

    let exporter = Exporter::new(service);
    let scope = if all {
        SettleScope::All
    } else {
        SettleScope::Unsettled
    };

    // Determine output writer
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
            let count = exporter.export_expenses_csv(trip_id, writer).await?;
            if output.is_some() {
                eprintln!("Exported {} expenses", count);
            }
        }
        "balances" => {
            let count = exporter.export_balances_csv(trip_id, scope, writer).await?;
            if output.is_some() {
                eprintln!("Exported {} balances", count);
            }
        }
        "transfers" => {
            let count = exporter.export_transfers_csv(trip_id, scope, writer).await?;
            if output.is_some() {
                eprintln!("Exported {} transfers", count);
            }
        }
        "settlement" => {
            let report = exporter
                .export_settlement_json(trip_id, scope, writer)
                .await?;
            if output.is_some() {
                eprintln!(
                    "Exported settlement: {} balances, {} transfers",
                    report.balances.len(),
                    report.transfers.len()
                );
            }
        }
        _ => {
            anyhow::bail!(
                "Invalid export type '{}'. Valid types: expenses, balances, transfers, settlement",
                export_type
            );
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn build_expense_draft(
    title: String,
    amount: &str,
    category: &str,
    date: Option<&str>,
    currency: Option<String>,
    paid: &[String],
    shares: &[String],
    among: Option<&str>,
) -> Result<ExpenseDraft> {
    let total_amount =
        parse_amount(amount).context("Invalid amount format. Use '45000' or '45,000'")?;

    let category = ExpenseCategory::from_str(category).ok_or_else(|| {
        anyhow::anyhow!(
            "Invalid category '{}'. Valid: food, accommodation, transport, entertainment, shopping, other",
            category
        )
    })?;

    let occurred_at = match date {
        Some(date_str) => parse_timestamp(date_str)
            .with_context(|| format!("Invalid date format '{}'. Use YYYY-MM-DD", date_str))?,
        None => Utc::now(),
    };

    let payments = paid
        .iter()
        .map(|entry| parse_line(entry))
        .collect::<Result<Vec<_>>>()
        .context("Invalid --paid entry")?;

    if !shares.is_empty() && among.is_some() {
        anyhow::bail!("Use either --share or --among, not both");
    }

    let share_lines = if let Some(ids) = among {
        split_evenly(total_amount, &parse_id_list(ids)?)
    } else {
        shares
            .iter()
            .map(|entry| parse_line(entry))
            .collect::<Result<Vec<_>>>()
            .context("Invalid --share entry")?
    };

    Ok(ExpenseDraft {
        title,
        category,
        occurred_at,
        total_amount,
        currency,
        payments,
        shares: share_lines,
    })
}

fn parse_line(entry: &str) -> Result<ExpenseLine> {
    let (id, amount) = entry
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("Expected ID=AMOUNT, got '{}'", entry))?;

    let participant_id: ParticipantId = id
        .trim()
        .parse()
        .with_context(|| format!("Invalid participant ID '{}'", id))?;
    let amount = parse_amount(amount.trim())?;

    Ok(ExpenseLine::new(participant_id, amount))
}

fn parse_id_list(ids: &str) -> Result<Vec<ParticipantId>> {
    ids.split(',')
        .map(|id| {
            id.trim()
                .parse()
                .with_context(|| format!("Invalid participant ID '{}'", id))
        })
        .collect()
}

fn truncate(s: &str, max_len: usize) -> String {
    // Cut between characters, never inside one; titles and names are
    // routinely multi-byte.
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

fn parse_date(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").context("Date must be in YYYY-MM-DD format")
}

fn parse_timestamp(date_str: &str) -> Result<DateTime<Utc>> {
    let naive_datetime = parse_date(date_str)?
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow::anyhow!("Invalid date"))?;

    Ok(DateTime::from_naive_utc_and_offset(naive_datetime, Utc))
}
