//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::flight::FlightDraft;

/// Fields for a new flight.
#[derive(Debug, Args)]
pub struct AddCommand {
    /// Origin airport code (e.g. JFK)
    #[arg(long)]
    pub from: String,

    /// Destination airport code (e.g. LHR)
    #[arg(long)]
    pub to: String,

    /// Flight date, YYYY-MM-DD
    #[arg(long)]
    pub date: String,

    /// Aircraft type (e.g. "Boeing 777")
    #[arg(long)]
    pub aircraft: String,

    /// Airline name
    #[arg(long)]
    pub airline: String,
}

impl From<AddCommand> for FlightDraft {
    fn from(cmd: AddCommand) -> Self {
        Self {
            from: cmd.from,
            to: cmd.to,
            date: cmd.date,
            aircraft: cmd.aircraft,
            airline: cmd.airline,
        }
    }
}

/// Changes to an existing flight; omitted fields keep their value.
#[derive(Debug, Args)]
pub struct EditCommand {
    /// Id of the flight to edit
    pub id: String,

    /// New origin airport code
    #[arg(long)]
    pub from: Option<String>,

    /// New destination airport code
    #[arg(long)]
    pub to: Option<String>,

    /// New date, YYYY-MM-DD
    #[arg(long)]
    pub date: Option<String>,

    /// New aircraft type
    #[arg(long)]
    pub aircraft: Option<String>,

    /// New airline
    #[arg(long)]
    pub airline: Option<String>,
}

impl EditCommand {
    /// Overlay the given fields on `draft`.
    #[must_use]
    pub fn apply_to(self, mut draft: FlightDraft) -> FlightDraft {
        let fields = [
            (self.from, &mut draft.from),
            (self.to, &mut draft.to),
            (self.date, &mut draft.date),
            (self.aircraft, &mut draft.aircraft),
            (self.airline, &mut draft.airline),
        ];
        for (value, slot) in fields {
            if let Some(value) = value {
                *slot = value;
            }
        }
        draft
    }
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Stats command arguments.
#[derive(Debug, Args)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Airport lookup arguments.
#[derive(Debug, Args)]
pub struct AirportsCommand {
    /// Match against code, name or city; lists every airport when omitted
    pub query: Option<String>,
}

/// Render command arguments.
#[derive(Debug, Args)]
pub struct RenderCommand {
    /// Directory for routes.geojson and airports.geojson
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub out: PathBuf,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Access token commands.
#[derive(Debug, Subcommand)]
pub enum TokenCommand {
    /// Save the map access token
    Set {
        /// The token
        token: String,
    },

    /// Remove the saved token
    Clear,

    /// Show where the active token comes from
    Show,
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

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}
