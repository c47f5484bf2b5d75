//! Locations command - list the pick-up and drop points

use anyhow::Result;
use colored::Colorize;

use hopon_core::domain::{CITY_LOCATIONS, LH_BLOCKS, MH_BLOCKS};

pub fn run(json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "MH": MH_BLOCKS,
                "LH": LH_BLOCKS,
                "CITY": CITY_LOCATIONS,
            }))?
        );
        return Ok(());
    }

    println!("{}", "Men's hostel blocks (MH:<block>)".bold());
    println!("  {}", MH_BLOCKS.join(", "));
    println!("{}", "Ladies' hostel blocks (LH:<block>)".bold());
    println!("  {}", LH_BLOCKS.join(", "));
    println!("{}", "Common places (any other text works too)".bold());
    println!("  {}", CITY_LOCATIONS.join(", "));
    Ok(())
}
