//! Post command - publish a new ride

use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use rust_decimal::Decimal;

use hopon_core::domain::{GenderPreference, Location};
use hopon_core::{OperationResult, RideInput};

use super::{format_departure, get_context};

pub struct PostArgs {
    pub from: String,
    pub to: String,
    pub at: String,
    pub price: Decimal,
    pub seats: u32,
    pub gender: String,
    pub phone: String,
}

pub async fn run(args: PostArgs, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let me = ctx.session_service.require()?;

    let gender: GenderPreference = args.gender.parse()?;
    let input = RideInput {
        from: Location::parse(&args.from),
        to: Location::parse(&args.to),
        departure_time: args.at,
        total_price: args.price,
        seats_total: args.seats,
        gender_preference: gender,
        contact_phone: args.phone,
    };

    let ride = ctx.ride_service.post(&input, &me, Utc::now()).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&OperationResult::ok(&ride))?);
        return Ok(());
    }

    println!("\n{} Ride posted\n", "✓".green());
    println!("  {} → {}", ride.from, ride.to);
    println!(
        "  {}",
        format_departure(ride.departure_time, ctx.ride_service.policy().utc_offset)
    );
    println!("  {} seats, ₹{} total", ride.seats_total, ride.total_price);
    println!("  {}", format!("id {}", ride.id).dimmed());
    Ok(())
}
