//! Board and personal ride listings

use anyhow::Result;
use chrono::Utc;
use colored::Colorize;

use hopon_core::{DestinationFilter, GenderFilter, ViewQuery};

use super::{get_context, parse_ride_id};
use crate::output;

/// Upcoming rides, optionally filtered
pub async fn list(to: Option<String>, gender: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let destination: DestinationFilter = to.as_deref().unwrap_or_default().parse()?;
    let gender: GenderFilter = gender.as_deref().unwrap_or_default().parse()?;
    let query = ViewQuery::new(destination, gender);

    let rides = ctx.ride_service.board(&query, Utc::now()).await?;

    if json {
        let me = ctx.session_service.current()?;
        let seen: Vec<_> = rides.iter().map(|ride| ride.visible_to(me.as_ref())).collect();
        println!("{}", serde_json::to_string_pretty(&seen)?);
        return Ok(());
    }

    if rides.is_empty() {
        println!("{}", "No upcoming rides match. Post one with `hopon post`.".dimmed());
        return Ok(());
    }

    println!(
        "{}",
        format!("Upcoming rides (to: {})", query.destination).bold()
    );
    println!("{}", output::rides_table(&rides, ctx.ride_service.policy().utc_offset));
    Ok(())
}

/// Rides the signed-in student posted, or joined with `--joined`
pub async fn mine(joined: bool, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let me = ctx.session_service.require()?;

    let rides = if joined {
        ctx.ride_service.joined_by(&me).await?
    } else {
        ctx.ride_service.posted_by(&me).await?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&rides)?);
        return Ok(());
    }

    let title = if joined { "Rides you joined" } else { "Rides you posted" };
    if rides.is_empty() {
        println!("{}", format!("{}: none", title).dimmed());
        return Ok(());
    }

    println!("{}", title.bold());
    println!("{}", output::rides_table(&rides, ctx.ride_service.policy().utc_offset));

    let now = Utc::now();
    let departed = rides.iter().filter(|r| r.departure_time <= now).count();
    if departed > 0 {
        println!("{}", format!("{} already departed", departed).dimmed());
    }
    Ok(())
}

/// Full details of one ride
pub async fn show(id: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let ride = ctx.ride_service.get(parse_ride_id(id)?).await?;
    let me = ctx.session_service.current()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&ride.visible_to(me.as_ref()))?);
        return Ok(());
    }

    let show_contact = me
        .as_ref()
        .is_some_and(|me| ride.is_created_by(me) || ride.has_passenger(me));
    println!(
        "{}",
        output::ride_details(&ride, ctx.ride_service.policy().utc_offset, show_contact)
    );
    if !show_contact {
        println!("{}", "Join the ride to see the contact number.".dimmed());
    }
    Ok(())
}
