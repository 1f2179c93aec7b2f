//! Operator probe for the ClientDesk core.
//!
//! # Responsibility
//! - Verify `clientdesk_core` linkage without starting the HTTP server.
//! - Run read-only checks against the configured store.
//! - Keep output deterministic for quick local sanity checks.

use clap::{Parser, Subcommand};
use clientdesk_core::{init_logging, AppConfig, DeskService};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "clientdesk", version, about = "ClientDesk operator probe")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print core liveness and version.
    Ping,
    /// Read the client sheet once and report store reachability.
    Health,
    /// List client names in row order.
    Clients,
    /// Print the fee schedule and custom overrides as JSON.
    Fees,
    /// Print per-client balances as JSON.
    Balances,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli.command.unwrap_or(Command::Ping)) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("clientdesk: {err}");
            ExitCode::FAILURE
        }
    }
}

fn open_desk() -> Result<DeskService, String> {
    let config = AppConfig::from_env().map_err(|err| err.to_string())?;
    init_logging(&config.log_level, config.log_dir.as_deref())?;
    DeskService::open(&config).map_err(|err| err.to_string())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|err| err.to_string())
}

fn run(command: Command) -> Result<ExitCode, String> {
    match command {
        Command::Ping => {
            println!("clientdesk_core ping={}", clientdesk_core::ping());
            println!("clientdesk_core version={}", clientdesk_core::core_version());
        }
        Command::Health => {
            let report = open_desk()?.health();
            println!("{}", to_json(&report)?);
            if !report.store_reachable {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Clients => {
            let desk = open_desk()?;
            for name in desk.client_names().map_err(|err| err.to_string())? {
                println!("{name}");
            }
        }
        Command::Fees => {
            let desk = open_desk()?;
            let fees = desk.fee_schedule().map_err(|err| err.to_string())?;
            let custom = desk.custom_fees().map_err(|err| err.to_string())?;
            println!(
                "{}",
                to_json(&serde_json::json!({ "fees": fees, "custom_fees": custom }))?
            );
        }
        Command::Balances => {
            let desk = open_desk()?;
            let fees = desk.fee_schedule().map_err(|err| err.to_string())?;
            let custom = desk.fees().load_custom_fees().map_err(|err| err.to_string())?;
            let balances = desk
                .clients()
                .balances(&fees, &custom)
                .map_err(|err| err.to_string())?;
            println!("{}", to_json(&balances)?);
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::Parser;

    #[test]
    fn no_subcommand_defaults_to_ping() {
        let cli = Cli::try_parse_from(["clientdesk"]).expect("parse");
        assert!(cli.command.is_none());
    }

    #[test]
    fn subcommands_parse() {
        let cli = Cli::try_parse_from(["clientdesk", "balances"]).expect("parse");
        assert!(matches!(cli.command, Some(Command::Balances)));
        assert!(Cli::try_parse_from(["clientdesk", "delete"]).is_err());
    }
}
