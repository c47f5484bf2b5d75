//! Logs command - what past `hopon` commands did

use anyhow::Result;
use chrono::{Duration, Local};
use clap::Subcommand;
use colored::Colorize;
use comfy_table::Cell;

use super::open_log;
use crate::output;
use hopon_core::services::{LoggedCommand, Outcome};
use hopon_core::LogQuery;

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Recent commands, newest first
    List {
        /// Number of commands to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Only commands that failed
        #[arg(long)]
        failed: bool,
        /// Only commands on this ride (a prefix of the id is enough)
        #[arg(long)]
        ride: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Runs and failures per command, and what the failures were
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Forget old entries
    Clear {
        /// Keep the last N days
        #[arg(long, default_value = "30")]
        days: u32,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: LogsCommands) -> Result<()> {
    match command {
        LogsCommands::List { limit, failed, ride, json } => list(
            LogQuery {
                failed_only: failed,
                ride_prefix: ride,
                limit,
            },
            json,
        ),
        LogsCommands::Stats { json } => stats(json),
        LogsCommands::Clear { days, force, json } => clear(days, force, json),
    }
}

fn result_cell(entry: &LoggedCommand) -> Cell {
    match entry.outcome {
        Outcome::Ok => Cell::new("ok".green().to_string()),
        Outcome::Failed => Cell::new(
            entry
                .error_kind
                .as_deref()
                .unwrap_or("failed")
                .red()
                .to_string(),
        ),
    }
}

fn list(query: LogQuery, json: bool) -> Result<()> {
    let entries = open_log()?.query(&query)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        output::info("Nothing logged yet.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["When", "Command", "Ride", "Result"]);
    for entry in &entries {
        let ride = entry
            .ride_id
            .as_deref()
            .map(|id| id.chars().take(8).collect::<String>())
            .unwrap_or_default();
        table.add_row(vec![
            Cell::new(entry.logged_at.with_timezone(&Local).format("%d %b %H:%M:%S")),
            Cell::new(&entry.command),
            Cell::new(ride),
            result_cell(entry),
        ]);
    }
    println!("{}", table);

    // A ride's history reads best with the reasons spelled out
    if query.ride_prefix.is_some() || query.failed_only {
        for entry in entries.iter().filter(|e| e.outcome == Outcome::Failed) {
            if let Some(message) = &entry.error_message {
                println!("  {} {}", entry.command.bold(), message.dimmed());
            }
        }
    }
    Ok(())
}

fn stats(json: bool) -> Result<()> {
    let log = open_log()?;
    let summary = log.summary()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!(
        "{} commands logged, {} failed ({})",
        summary.total,
        summary.failed,
        log.db_path().display()
    );
    if summary.by_command.is_empty() {
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Command", "Runs", "Failed"]);
    for tally in &summary.by_command {
        table.add_row(vec![
            tally.command.clone(),
            tally.runs.to_string(),
            tally.failures.to_string(),
        ]);
    }
    println!("{}", table);

    if !summary.failures_by_kind.is_empty() {
        let kinds: Vec<String> = summary
            .failures_by_kind
            .iter()
            .map(|(kind, count)| format!("{} x{}", kind, count))
            .collect();
        println!("Failures: {}", kinds.join(", ").red());
    }
    Ok(())
}

fn clear(days: u32, force: bool, json: bool) -> Result<()> {
    if !force && !json {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(format!("Forget commands logged more than {} days ago?", days))
            .default(false)
            .interact()?;
        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    let deleted = open_log()?.prune_older_than(Duration::days(i64::from(days)))?;
    if json {
        println!("{}", serde_json::json!({ "deleted": deleted }));
    } else {
        output::success(&format!("Forgot {} logged commands", deleted));
    }
    Ok(())
}
