//! Command-line interface for shiprasetu.
//!
//! This module provides the CLI structure and command handlers for the
//! `shiprasetu` binary.

mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AlertsCommand, BookCommand, BookingCommand, ConfigCommand, FilterArg, GhatsCommand, LevelArg,
    LostFoundCommand, OutputFormat, PriorityArg, RecommendationArg, RecsCommand, ReportKindArg,
    ResetCommand, RoutesCommand, StatusCommand, WatchCommand,
};

/// shiprasetu - Crowd guidance desk for Simhastha 2028
///
/// Broadcast alerts, publish route advice, and update ghat and route crowd
/// levels. Every command works on a shared database, so changes made here
/// show up in every other open session.
#[derive(Debug, Parser)]
#[command(name = "shiprasetu")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage broadcast alerts
    #[command(subcommand)]
    Alerts(AlertsCommand),

    /// Manage route recommendations
    #[command(subcommand)]
    Recs(RecsCommand),

    /// View or update ghat crowd levels
    #[command(subcommand)]
    Ghats(GhatsCommand),

    /// View or update route paths
    #[command(subcommand)]
    Routes(RoutesCommand),

    /// Show a summary of the shared state
    Status(StatusCommand),

    /// Re-read everything from storage
    Refresh,

    /// Follow changes made by other sessions until interrupted
    Watch(WatchCommand),

    /// Clear the shared collections so they return to the built-in data
    Reset(ResetCommand),

    /// Book a bathing slot
    Book(BookCommand),

    /// Show or clear the current booking
    #[command(subcommand)]
    Booking(BookingCommand),

    /// Lost-and-found reports
    #[command(subcommand)]
    LostFound(LostFoundCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn cli_with(verbose: u8, quiet: bool) -> Cli {
        Cli {
            config: None,
            verbose,
            quiet,
            command: Command::Status(StatusCommand { json: false }),
        }
    }

    #[test]
    fn test_cli_name() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "shiprasetu");
    }

    #[test]
    fn test_verbosity_levels() {
        use crate::logging::Verbosity;

        assert_eq!(cli_with(0, true).verbosity(), Verbosity::Quiet);
        assert_eq!(cli_with(0, false).verbosity(), Verbosity::Normal);
        assert_eq!(cli_with(1, false).verbosity(), Verbosity::Verbose);
        assert_eq!(cli_with(2, false).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_alerts_add() {
        let cli =
            Cli::try_parse_from(["shiprasetu", "alerts", "add", "Gate 2 closed", "-p", "high"])
                .unwrap();
        match cli.command {
            Command::Alerts(AlertsCommand::Add { message, priority }) => {
                assert_eq!(message, "Gate 2 closed");
                assert_eq!(priority, PriorityArg::High);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_alerts_add_default_priority() {
        let cli = Cli::try_parse_from(["shiprasetu", "alerts", "add", "hello"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Alerts(AlertsCommand::Add {
                priority: PriorityArg::Medium,
                ..
            })
        ));
    }

    #[test]
    fn test_parse_recs_add() {
        let cli = Cli::try_parse_from([
            "shiprasetu",
            "recs",
            "add",
            "Use the river walk",
            "--type",
            "alternative",
            "--route",
            "Gate 5 → Ram Ghat",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Recs(RecsCommand::Add {
                kind: RecommendationArg::Alternative,
                ..
            })
        ));
    }

    #[test]
    fn test_parse_ghats_set() {
        let cli = Cli::try_parse_from(["shiprasetu", "ghats", "set", "2", "low"]).unwrap();
        match cli.command {
            Command::Ghats(GhatsCommand::Set {
                id,
                level,
                remarks,
                clear_remarks,
            }) => {
                assert_eq!(id, 2);
                assert_eq!(level, LevelArg::Low);
                assert!(remarks.is_none());
                assert!(!clear_remarks);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_remarks_conflict() {
        let result = Cli::try_parse_from([
            "shiprasetu",
            "ghats",
            "set",
            "2",
            "low",
            "--remarks",
            "x",
            "--clear-remarks",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_routes_set() {
        let cli = Cli::try_parse_from([
            "shiprasetu",
            "routes",
            "set",
            "3",
            "low",
            "--notes",
            "now clear",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Routes(RoutesCommand::Set {
                id: 3,
                closed: false,
                ..
            })
        ));
    }

    #[test]
    fn test_parse_lost_found() {
        let cli = Cli::try_parse_from(["shiprasetu", "lost-found", "list", "--filter", "lost"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Command::LostFound(LostFoundCommand::List {
                filter: FilterArg::Lost,
                ..
            })
        ));
    }

    #[test]
    fn test_parse_watch() {
        let cli = Cli::try_parse_from(["shiprasetu", "watch", "-i", "3"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Watch(WatchCommand { interval: Some(3) })
        ));
    }

    #[test]
    fn test_parse_with_config() {
        let cli =
            Cli::try_parse_from(["shiprasetu", "-c", "/custom/config.toml", "status"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_with_verbose() {
        let cli = Cli::try_parse_from(["shiprasetu", "-vv", "refresh"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Command::Refresh));
    }

    #[test]
    fn test_parse_rejects_unknown_level() {
        assert!(Cli::try_parse_from(["shiprasetu", "ghats", "set", "1", "extreme"]).is_err());
    }
}
