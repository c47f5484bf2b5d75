//! Output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, CellAlignment, ContentArrangement, Table};
use chrono::FixedOffset;

use hopon_core::Ride;

use crate::commands::{format_departure, short_id};

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Seats column, e.g. `2/4` or `FULL`
fn seats_cell(ride: &Ride) -> Cell {
    let cell = if ride.is_full() {
        Cell::new("FULL".red().to_string())
    } else {
        Cell::new(format!("{}/{}", ride.seats_filled, ride.seats_total))
    };
    cell.set_alignment(CellAlignment::Right)
}

/// Table of rides, one per row
pub fn rides_table(rides: &[Ride], offset: FixedOffset) -> Table {
    let mut table = create_table();
    table.set_header(vec!["Id", "From", "To", "Departs", "Seats", "Price", "Gender"]);
    for ride in rides {
        table.add_row(vec![
            Cell::new(short_id(ride)),
            Cell::new(ride.from.to_string()),
            Cell::new(ride.to.to_string()),
            Cell::new(format_departure(ride.departure_time, offset)),
            seats_cell(ride),
            Cell::new(format!("₹{}", ride.total_price)).set_alignment(CellAlignment::Right),
            Cell::new(ride.gender_preference.as_str()),
        ]);
    }
    table
}

/// Detailed view of one ride
///
/// The contact number is only shown to the creator and to passengers.
pub fn ride_details(ride: &Ride, offset: FixedOffset, show_contact: bool) -> Table {
    let mut table = create_table();
    table.add_row(vec!["Ride", &ride.id.to_string()]);
    table.add_row(vec!["From", &ride.from.to_string()]);
    table.add_row(vec!["To", &ride.to.to_string()]);
    table.add_row(vec!["Departs", &format_departure(ride.departure_time, offset)]);
    table.add_row(vec![
        "Seats",
        &format!("{} of {} taken, {} left", ride.seats_filled, ride.seats_total, ride.seats_left()),
    ]);
    table.add_row(vec!["Total price", &format!("₹{}", ride.total_price)]);
    table.add_row(vec!["Gender", ride.gender_preference.as_str()]);
    table.add_row(vec!["Posted by", &ride.created_by.email]);
    if show_contact {
        table.add_row(vec!["Contact", ride.contact_phone.as_str()]);
        if !ride.passengers.is_empty() {
            table.add_row(vec!["Passengers", &ride.passengers.join("\n")]);
        }
    }
    table
}
