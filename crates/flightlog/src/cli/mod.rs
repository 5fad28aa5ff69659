//! Command-line interface for flightlog.
//!
//! This module provides the CLI structure for the `flightlog` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AddCommand, AirportsCommand, ConfigCommand, EditCommand, ListCommand, OutputFormat,
    RenderCommand, StatsCommand, StatusCommand, TokenCommand,
};

use crate::logging::Verbosity;

/// flightlog - Keep a log of the flights you have taken
///
/// Records flights between known airports, computes distance statistics,
/// renders the routes as map layers and shares the whole log as a link.
#[derive(Debug, Parser)]
#[command(name = "flightlog")]
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
    /// Log a flight
    Add(AddCommand),

    /// Change a logged flight
    Edit(EditCommand),

    /// Delete a logged flight
    Remove {
        /// Id of the flight
        id: String,
    },

    /// Delete every logged flight
    Clear {
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// List logged flights, newest first
    List(ListCommand),

    /// Show flight statistics
    Stats(StatsCommand),

    /// Look up known airports
    Airports(AirportsCommand),

    /// Print a link that shares every logged flight
    Share,

    /// Replace the log with the flights in a share link
    Import {
        /// The share link
        url: String,
    },

    /// Write the map layers as GeoJSON files
    Render(RenderCommand),

    /// Manage the map access token
    #[command(subcommand)]
    Token(TokenCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Show log and storage status
    Status(StatusCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}
