//! Error types for flightlog.
//!
//! This module defines all error types used throughout the flightlog crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::map::SurfaceError;

/// The main error type for flightlog operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Flight Errors ===
    /// A flight entry was rejected before any state changed.
    #[error("invalid flight: {0}")]
    Validation(#[from] ValidationError),

    /// No flight with the given id exists.
    #[error("flight not found: {id}")]
    FlightNotFound {
        /// The id that was looked up.
        id: String,
    },

    // === Share Errors ===
    /// A share link could not be decoded.
    #[error("invalid share link: {message}")]
    ShareDecode {
        /// Description of what went wrong.
        message: String,
    },

    // === Map Errors ===
    /// The map surface did not finish initializing in time.
    #[error("map surface not ready after {}ms", timeout.as_millis())]
    SurfaceNotReady {
        /// How long the caller waited.
        timeout: Duration,
    },

    /// The map surface rejected an operation.
    #[error("map surface error: {0}")]
    Surface(#[from] SurfaceError),

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Reasons a flight entry is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Origin and destination are the same airport.
    #[error("origin and destination are both {0}")]
    SameAirport(String),

    /// The airport code is malformed or not in the geocode table.
    #[error("unknown airport code: {0}")]
    UnknownAirport(String),

    /// The date is not a valid `YYYY-MM-DD` calendar date.
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
}

/// A specialized Result type for flightlog operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a new share decode error.
    #[must_use]
    pub fn share_decode(message: impl Into<String>) -> Self {
        Self::ShareDecode {
            message: message.into(),
        }
    }

    /// Create a flight-not-found error.
    #[must_use]
    pub fn flight_not_found(id: impl Into<String>) -> Self {
        Self::FlightNotFound { id: id.into() }
    }

    /// Check if this error is a user-facing validation failure.
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
