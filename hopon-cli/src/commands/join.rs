//! Join and leave commands

use anyhow::Result;
use colored::Colorize;

use hopon_core::{JoinOutcome, LeaveOutcome, OperationResult};

use super::{get_context, parse_ride_id};
use crate::output;

pub async fn join(id: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let me = ctx.session_service.require()?;
    let outcome = ctx.ride_service.join(parse_ride_id(id)?, &me).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&OperationResult::ok(&outcome))?);
        return Ok(());
    }

    match outcome {
        JoinOutcome::Joined(ride) => {
            println!("\n{} Joined {} → {}\n", "✓".green(), ride.from, ride.to);
            println!("  Contact the creator on {}", ride.contact_phone.as_str().bold());
            println!("  {} seats left", ride.seats_left());
        }
        JoinOutcome::AlreadyJoined(ride) => {
            output::info(&format!("You already have a seat on {} → {}", ride.from, ride.to));
        }
    }
    Ok(())
}

pub async fn leave(id: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let me = ctx.session_service.require()?;
    let outcome = ctx.ride_service.leave(parse_ride_id(id)?, &me).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&OperationResult::ok(&outcome))?);
        return Ok(());
    }

    match outcome {
        LeaveOutcome::Left(ride) => {
            output::success(&format!("Left {} → {}", ride.from, ride.to));
        }
        LeaveOutcome::NotAPassenger => {
            output::warning("You are not a passenger on this ride");
        }
    }
    Ok(())
}
