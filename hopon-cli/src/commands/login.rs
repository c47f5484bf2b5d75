//! Login, logout and whoami

use anyhow::Result;
use colored::Colorize;

use super::get_context;
use crate::output;

pub fn login(email: &str, user_id: Option<&str>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let identity = ctx.session_service.login(email, user_id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&identity)?);
        return Ok(());
    }

    output::success(&format!("Logged in as {}", identity.email));
    Ok(())
}

pub fn logout() -> Result<()> {
    let ctx = get_context()?;
    if ctx.session_service.logout()? {
        output::success("Logged out");
    } else {
        println!("{}", "Not logged in".dimmed());
    }
    Ok(())
}

pub fn whoami(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let current = ctx.session_service.current()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&current)?);
        return Ok(());
    }

    match current {
        Some(identity) => {
            println!("{}", identity.email.bold());
            if let Some(id) = identity.user_id {
                println!("{}", format!("user id {}", id).dimmed());
            }
        }
        None => output::warning("Not logged in. Run `hopon login <email>` first"),
    }
    if ctx.config.demo_mode {
        output::info("Demo mode is ON");
    }
    Ok(())
}
