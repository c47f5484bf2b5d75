//! Demo command - manage demo mode

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use super::get_hopon_dir;
use hopon_core::adapters::demo::DEMO_EMAIL;
use hopon_core::services::DemoService;

#[derive(Subcommand)]
pub enum DemoCommands {
    /// Enable demo mode
    #[command(name = "on")]
    On,
    /// Disable demo mode
    #[command(name = "off")]
    Off {
        /// Also delete the demo database
        #[arg(long)]
        clean: bool,
    },
    /// Show demo mode status
    Status,
}

pub async fn run(command: Option<DemoCommands>) -> Result<()> {
    let hopon_dir = get_hopon_dir()?;
    std::fs::create_dir_all(&hopon_dir)?;
    let demo_service = DemoService::new(&hopon_dir);

    match command {
        Some(DemoCommands::On) => {
            let seeded = demo_service.enable().await?;
            println!("{}", "Demo mode enabled".green());
            println!(
                "{} sample rides posted. Run 'hopon login {}' and 'hopon list' to look around.",
                seeded, DEMO_EMAIL
            );
            Ok(())
        }
        Some(DemoCommands::Off { clean }) => {
            demo_service.disable(clean)?;
            println!("{}", "Demo mode disabled".yellow());
            Ok(())
        }
        Some(DemoCommands::Status) | None => {
            if demo_service.is_enabled()? {
                println!("Demo mode is {}", "ON".green());
            } else {
                println!("Demo mode is {}", "OFF".yellow());
            }
            Ok(())
        }
    }
}
