//! Delete command - remove a ride you posted

use anyhow::Result;
use colored::Colorize;
use dialoguer::Confirm;

use hopon_core::{Error, OperationResult};

use super::{format_departure, get_context, parse_ride_id};

pub async fn run(id: &str, force: bool, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let me = ctx.session_service.require()?;
    let ride_id = parse_ride_id(id)?;

    let ride = ctx.ride_service.get(ride_id).await?;
    if !ride.is_created_by(&me) {
        return Err(Error::Unauthorized.into());
    }

    // Confirm removal unless --force
    if !force && !json {
        println!(
            "\n{}",
            format!(
                "This will delete the ride {} → {} on {}.",
                ride.from,
                ride.to,
                format_departure(ride.departure_time, ctx.ride_service.policy().utc_offset)
            )
            .yellow()
        );
        if !ride.passengers.is_empty() {
            println!(
                "{}\n",
                format!("{} passenger(s) will lose their seat.", ride.passengers.len()).dimmed()
            );
        }

        if !Confirm::new()
            .with_prompt("Are you sure?")
            .default(false)
            .interact()?
        {
            println!("{}\n", "Cancelled".dimmed());
            return Ok(());
        }
    }

    let deletion = ctx.ride_service.delete(ride_id, &me).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&OperationResult::ok(deletion))?);
    } else {
        println!("\n{} Ride deleted\n", "✓".green());
    }
    Ok(())
}
