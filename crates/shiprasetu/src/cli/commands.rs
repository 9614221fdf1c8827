//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::lost_found::{ReportFilter, ReportKind};
use crate::records::{CrowdLevel, Priority, RecommendationKind};

/// Alert commands.
#[derive(Debug, Subcommand)]
pub enum AlertsCommand {
    /// List alerts, most recent first
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Broadcast a new alert
    Add {
        /// Alert text
        message: String,

        /// Alert priority
        #[arg(short, long, value_enum, default_value = "medium")]
        priority: PriorityArg,
    },

    /// Delete an alert by id
    Delete {
        /// Alert id
        id: i64,
    },
}

/// Route recommendation commands.
#[derive(Debug, Subcommand)]
pub enum RecsCommand {
    /// List recommendations
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Add a recommendation
    Add {
        /// Recommendation text
        message: String,

        /// Recommendation type
        #[arg(short = 't', long = "type", value_enum, default_value = "recommended")]
        kind: RecommendationArg,

        /// Route description, e.g. "Gate 3 → Ram Ghat"
        #[arg(short, long)]
        route: String,
    },

    /// Delete a recommendation by id
    Delete {
        /// Recommendation id
        id: i64,
    },
}

/// Ghat status commands.
#[derive(Debug, Subcommand)]
pub enum GhatsCommand {
    /// List ghat statuses
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Set a ghat's crowd level
    Set {
        /// Ghat id
        id: i64,

        /// New crowd level
        #[arg(value_enum)]
        level: LevelArg,

        /// Replace the remarks
        #[arg(short, long, conflicts_with = "clear_remarks")]
        remarks: Option<String>,

        /// Remove the remarks
        #[arg(long)]
        clear_remarks: bool,
    },
}

/// Route path commands.
#[derive(Debug, Subcommand)]
pub enum RoutesCommand {
    /// List route paths
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Set a route's crowd level, notes and open flag
    Set {
        /// Route id
        id: i64,

        /// New crowd level
        #[arg(value_enum)]
        level: LevelArg,

        /// Replace the notes
        #[arg(short, long, conflicts_with = "clear_notes")]
        notes: Option<String>,

        /// Remove the notes
        #[arg(long)]
        clear_notes: bool,

        /// Mark the route closed
        #[arg(long)]
        closed: bool,
    },

    /// Open a closed route or close an open one
    Toggle {
        /// Route id
        id: i64,
    },
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Watch command arguments.
#[derive(Debug, Args)]
pub struct WatchCommand {
    /// Seconds between polls (overrides the configured interval)
    #[arg(short, long)]
    pub interval: Option<u64>,
}

/// Reset command arguments.
#[derive(Debug, Args)]
pub struct ResetCommand {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Book command arguments.
#[derive(Debug, Args)]
pub struct BookCommand {
    /// Pilgrim's full name
    #[arg(long)]
    pub name: String,

    /// Age in years
    #[arg(long)]
    pub age: String,

    /// male, female or other
    #[arg(long)]
    pub gender: String,

    /// Ghat to book
    #[arg(long)]
    pub ghat: String,

    /// Date of the visit
    #[arg(long)]
    pub date: String,

    /// Time slot, e.g. "06:00 AM - 08:00 AM"
    #[arg(long)]
    pub slot: String,

    /// Write the confirmation receipt into this directory
    #[arg(long, value_name = "DIR")]
    pub receipt: Option<PathBuf>,
}

/// Booking commands.
#[derive(Debug, Subcommand)]
pub enum BookingCommand {
    /// Show the current booking
    Show {
        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Print the bookable ghats and time slots
    Options,

    /// Forget the current booking
    Clear,
}

/// Lost-and-found commands.
#[derive(Debug, Subcommand)]
pub enum LostFoundCommand {
    /// List or search reports
    List {
        /// Search name, description and location
        #[arg(short, long, default_value = "")]
        search: String,

        /// Limit to lost or found reports
        #[arg(long, value_enum, default_value = "all")]
        filter: FilterArg,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Post a report
    Report {
        /// lost or found
        #[arg(value_enum)]
        kind: ReportKindArg,

        /// Name of the person
        #[arg(long)]
        name: String,

        /// Age
        #[arg(long, default_value = "")]
        age: String,

        /// Gender
        #[arg(long, default_value = "")]
        gender: String,

        /// Last seen or found at
        #[arg(long)]
        location: String,

        /// Identifying details
        #[arg(long)]
        description: String,
    },

    /// Mark a report resolved
    Resolve {
        /// Report id
        id: i64,
    },
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Alert priority argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PriorityArg {
    /// Urgent
    High,
    /// Worth knowing
    Medium,
    /// Informational
    Low,
}

impl From<PriorityArg> for Priority {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::High => Self::High,
            PriorityArg::Medium => Self::Medium,
            PriorityArg::Low => Self::Low,
        }
    }
}

/// Recommendation type argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RecommendationArg {
    /// Preferred route
    Recommended,
    /// Fallback route
    Alternative,
    /// Route to stay away from
    Avoid,
}

impl From<RecommendationArg> for RecommendationKind {
    fn from(arg: RecommendationArg) -> Self {
        match arg {
            RecommendationArg::Recommended => Self::Recommended,
            RecommendationArg::Alternative => Self::Alternative,
            RecommendationArg::Avoid => Self::Avoid,
        }
    }
}

/// Crowd level argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LevelArg {
    /// Light crowd
    Low,
    /// Steady crowd
    Moderate,
    /// Heavy crowd
    High,
}

impl From<LevelArg> for CrowdLevel {
    fn from(arg: LevelArg) -> Self {
        match arg {
            LevelArg::Low => Self::Low,
            LevelArg::Moderate => Self::Moderate,
            LevelArg::High => Self::High,
        }
    }
}

/// Lost-and-found report kind argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportKindArg {
    /// Someone is missing
    Lost,
    /// Someone was found
    Found,
}

impl From<ReportKindArg> for ReportKind {
    fn from(arg: ReportKindArg) -> Self {
        match arg {
            ReportKindArg::Lost => Self::Lost,
            ReportKindArg::Found => Self::Found,
        }
    }
}

/// Lost-and-found filter argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum FilterArg {
    /// Every report
    #[default]
    All,
    /// Lost reports only
    Lost,
    /// Found reports only
    Found,
}

impl From<FilterArg> for ReportFilter {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::All => Self::All,
            FilterArg::Lost => Self::Lost,
            FilterArg::Found => Self::Found,
        }
    }
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// JSON output
    Json,
}
