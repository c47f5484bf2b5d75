//! HopOn CLI - the campus ride board in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

mod commands;
mod output;

use commands::{delete, demo, join, locations, login, logs, post, rides};
use hopon_core::CommandEvent;

/// HopOn - share cabs with fellow students
#[derive(Parser)]
#[command(name = "hopon", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with your campus email
    Login {
        /// Campus email address
        email: String,
        /// Stable user id issued by the hosted backend
        #[arg(long)]
        user_id: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sign out
    Logout,

    /// Show who is signed in
    Whoami {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List upcoming rides, soonest first
    List {
        /// Destination filter: MH, LH, or part of a place name
        #[arg(long)]
        to: Option<String>,
        /// Gender filter: any, male or female
        #[arg(long)]
        gender: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rides you posted (or joined)
    Mine {
        /// Show rides you joined instead of rides you posted
        #[arg(long)]
        joined: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one ride in detail
    Show {
        /// Ride id
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Post a new ride
    Post {
        /// Starting point, e.g. MH:J, LH:C or Katpadi Jn
        #[arg(long)]
        from: String,
        /// Destination, e.g. Chennai Airport or MH:Q
        #[arg(long)]
        to: String,
        /// Departure, e.g. 2025-03-01T18:30 (campus time) or RFC 3339
        #[arg(long)]
        at: String,
        /// Total cab price, split between everyone on board
        #[arg(long)]
        price: Decimal,
        /// Seats offered (1-6)
        #[arg(long)]
        seats: u32,
        /// Gender preference: any, male or female
        #[arg(long, default_value = "any")]
        gender: String,
        /// Contact number; +91 is assumed without a country code
        #[arg(long)]
        phone: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Take a seat on a ride
    Join {
        /// Ride id
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Give up your seat on a ride
    Leave {
        /// Ride id
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a ride you posted
    Delete {
        /// Ride id
        id: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List hostel blocks and common places
    Locations {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage demo mode
    Demo {
        #[command(subcommand)]
        command: Option<demo::DemoCommands>,
    },

    /// Inspect the log of past commands
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Login { .. } => "login",
            Commands::Logout => "logout",
            Commands::Whoami { .. } => "whoami",
            Commands::List { .. } => "list",
            Commands::Mine { .. } => "mine",
            Commands::Show { .. } => "show",
            Commands::Post { .. } => "post",
            Commands::Join { .. } => "join",
            Commands::Leave { .. } => "leave",
            Commands::Delete { .. } => "delete",
            Commands::Locations { .. } => "locations",
            Commands::Demo { .. } => "demo",
            Commands::Logs { .. } => "logs",
        }
    }

    /// Ride the command acts on, for the event log
    fn ride_id(&self) -> Option<&str> {
        match self {
            Commands::Show { id, .. }
            | Commands::Join { id, .. }
            | Commands::Leave { id, .. }
            | Commands::Delete { id, .. } => Some(id),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let name = cli.command.name();
    let ride_id = cli.command.ride_id().map(str::to_string);
    // `logs` reads the command log and is not recorded in it
    let recorded = !matches!(cli.command, Commands::Logs { .. });

    let result = run(cli).await;

    if recorded {
        let event = match &result {
            Ok(()) => CommandEvent::ok(name),
            Err(e) => CommandEvent::failed(name, e),
        };
        let event = match ride_id {
            Some(id) => event.on_ride(id),
            None => event,
        };
        commands::record(&event);
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Login { email, user_id, json } => login::login(&email, user_id.as_deref(), json),
        Commands::Logout => login::logout(),
        Commands::Whoami { json } => login::whoami(json),
        Commands::List { to, gender, json } => rides::list(to, gender, json).await,
        Commands::Mine { joined, json } => rides::mine(joined, json).await,
        Commands::Show { id, json } => rides::show(&id, json).await,
        Commands::Post { from, to, at, price, seats, gender, phone, json } => {
            let args = post::PostArgs { from, to, at, price, seats, gender, phone };
            post::run(args, json).await
        }
        Commands::Join { id, json } => join::join(&id, json).await,
        Commands::Leave { id, json } => join::leave(&id, json).await,
        Commands::Delete { id, force, json } => delete::run(&id, force, json).await,
        Commands::Locations { json } => locations::run(json),
        Commands::Demo { command } => demo::run(command).await,
        Commands::Logs { command } => logs::run(command),
    }
}
