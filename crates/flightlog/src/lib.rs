//! `flightlog` - A personal flight log with a globe route map
//!
//! This library keeps an ordered list of flights between known airports,
//! persists it in a local key/value store, computes travel statistics, and
//! keeps a map surface's route and airport layers in sync with the list.
//! The whole list can be shared as a single self-contained link.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod airports;
pub mod cli;
pub mod config;
pub mod error;
pub mod flight;
pub mod geo;
pub mod logging;
pub mod map;
pub mod session;
pub mod share;
pub mod stats;
pub mod storage;
pub mod store;

pub use airports::{Airport, GeocodeTable};
pub use config::Config;
pub use error::{Error, Result, ValidationError};
pub use flight::{Flight, FlightDraft};
pub use geo::Coordinates;
pub use logging::init_logging;
pub use map::{HeadlessSurface, MapSurface, MapSyncController, MapView, SyncState, ViewEvent};
pub use session::{LoadSource, Session};
pub use share::{share_url, SharePayload};
pub use stats::FlightStats;
pub use storage::{KeyValueStore, MemoryStore, SqliteStore, StorageStats};
pub use store::FlightStore;
