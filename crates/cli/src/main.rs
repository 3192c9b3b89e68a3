//! `daybook` binary: journal entries in, AI feedback out.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use console::style;
use domain::{Config, Entry, Feedback, FeedbackStatus};
use feedback::FeedbackService;
use indicatif::{ProgressBar, ProgressStyle};
use journal::JournalStore;
use llm::provider_from_config;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "daybook")]
#[command(about = "Personal daily journal with AI feedback")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a day's numbers
    Add {
        /// Entry date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, default_value_t = 0.0)]
        income: f64,
        #[arg(long, default_value_t = 0.0)]
        expenses: f64,
        #[arg(long, default_value_t = 0.0)]
        hours_worked: f64,
        #[arg(long, default_value_t = 0.0)]
        sleep_hours: f64,
        /// Self-reported stress, 1 to 10
        #[arg(long)]
        stress: u8,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Show one entry and its feedback
    Show {
        /// Entry date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// List recent entries
    List {
        #[arg(long, default_value_t = 14)]
        limit: usize,
    },
    /// Replace the notes of an existing entry
    Notes {
        date: NaiveDate,
        notes: String,
    },
    /// Request AI feedback for an entry
    Feedback {
        /// Entry date (YYYY-MM-DD), defaults to today
        date: Option<NaiveDate>,
        /// Block until the result is ready instead of returning pending
        #[arg(long)]
        wait: bool,
        /// Extra context appended to the prompt for this request only
        #[arg(long)]
        context: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let store = Arc::new(JournalStore::open(&config.db_path)?);

    match cli.command {
        Commands::Add {
            date,
            income,
            expenses,
            hours_worked,
            sleep_hours,
            stress,
            notes,
        } => {
            let date = date.unwrap_or_else(today);
            let entry = Entry::new(
                &config.owner,
                date,
                income,
                expenses,
                hours_worked,
                sleep_hours,
                stress,
                &notes,
            );
            entry
                .validate_for_prompt()
                .map_err(|err| anyhow!(err.to_string()))?;
            store.create_entry(&entry).await?;
            println!("{} entry recorded for {}", style("✓").green(), date);
        }
        Commands::Show { date } => {
            let date = date.unwrap_or_else(today);
            let entry = find_entry(&store, &config.owner, date).await?;
            print_entry(&entry);
            match store.get_feedback(&entry.id).await? {
                Some(record) => print_feedback(&record),
                None => println!("  feedback: {}", style("not requested").dim()),
            }
        }
        Commands::List { limit } => {
            let entries = store.list_entries(&config.owner, limit).await?;
            if entries.is_empty() {
                println!("No entries yet. Start with `daybook add --stress 5`.");
                return Ok(());
            }
            for entry in entries {
                let marker = match store.get_feedback(&entry.id).await? {
                    Some(record) => status_marker(record.status),
                    None => style("·").dim().to_string(),
                };
                println!(
                    "{} {}  income {:>8.2}  expenses {:>8.2}  stress {}/10  {}",
                    marker,
                    entry.date,
                    entry.income,
                    entry.expenses,
                    entry.stress_level,
                    truncate(&entry.notes, 40),
                );
            }
        }
        Commands::Notes { date, notes } => {
            let entry = find_entry(&store, &config.owner, date).await?;
            store.update_notes(&entry.id, &notes).await?;
            println!("{} notes updated for {}", style("✓").green(), date);
        }
        Commands::Feedback {
            date,
            wait,
            context,
        } => {
            let date = date.unwrap_or_else(today);
            let entry = find_entry(&store, &config.owner, date).await?;

            let provider = provider_from_config(&config.provider)?;
            let service = FeedbackService::new(Arc::clone(&store), provider, config.retry)
                .with_profile_context(config.profile_context.clone());

            let record = service
                .request_feedback_with_context(entry.id, context.as_deref())
                .await
                .map_err(|err| anyhow!(err.to_string()))?;

            if !wait {
                print_feedback(&record);
                if record.status == FeedbackStatus::Pending {
                    println!(
                        "  check back with `daybook show --date {}` or re-run with --wait",
                        date
                    );
                    // The generation runs on a background task inside this
                    // process; exiting now would abandon it.
                    println!(
                        "  {}",
                        style("staying alive until the result is stored (ctrl-c to abandon)...")
                            .dim()
                    );
                    let _ = service.wait_for(entry.id).await;
                }
                return Ok(());
            }

            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::with_template("{spinner:.cyan} {msg}")
                    .context("spinner template")?,
            );
            spinner.set_message(format!("Generating feedback for {date}..."));
            spinner.enable_steady_tick(Duration::from_millis(120));

            let result = service.wait_for(entry.id).await;
            spinner.finish_and_clear();

            let record = result.map_err(|err| anyhow!(err.to_string()))?;
            print_feedback(&record);
        }
    }

    Ok(())
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

async fn find_entry(store: &JournalStore, owner: &str, date: NaiveDate) -> Result<Entry> {
    store
        .get_entry_by_date(owner, date)
        .await?
        .ok_or_else(|| anyhow!("No entry for {date}. Create one with `daybook add`."))
}

fn print_entry(entry: &Entry) {
    println!("{}", style(entry.date).bold());
    println!("  income:       {:.2}", entry.income);
    println!("  expenses:     {:.2}", entry.expenses);
    println!("  hours worked: {:.1}", entry.hours_worked);
    println!("  hours slept:  {:.1}", entry.sleep_hours);
    println!("  stress:       {}/10", entry.stress_level);
    if !entry.notes.is_empty() {
        println!("  notes:        {}", entry.notes);
    }
}

fn print_feedback(record: &Feedback) {
    match record.status {
        FeedbackStatus::Pending => {
            println!("  feedback: {}", style("pending").yellow());
        }
        FeedbackStatus::Completed => {
            println!(
                "  feedback: {} ({} {}, {} tokens, {:.1}s)",
                style("completed").green(),
                record.provider,
                record.model,
                record
                    .tokens_used
                    .map_or("?".to_string(), |t| t.to_string()),
                record
                    .generation_time
                    .unwrap_or_default()
                    .as_secs_f64(),
            );
            println!();
            println!("{}", record.content);
        }
        FeedbackStatus::Failed => {
            println!(
                "  feedback: {}: {}",
                style("failed").red(),
                record.error_message
            );
        }
    }
}

fn status_marker(status: FeedbackStatus) -> String {
    match status {
        FeedbackStatus::Pending => style("…").yellow().to_string(),
        FeedbackStatus::Completed => style("✓").green().to_string(),
        FeedbackStatus::Failed => style("✗").red().to_string(),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}…")
    }
}
