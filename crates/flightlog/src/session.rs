//! Startup: decide where the flight list comes from.

use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use crate::share::{decode_share_url, strip_share_param};
use crate::storage::KeyValueStore;
use crate::store::FlightStore;

/// Where the session's flights were loaded from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "source")]
pub enum LoadSource {
    /// The persisted list.
    Persisted,
    /// A share link, which then replaced the persisted list.
    Shared {
        /// When the link was created, if it said.
        timestamp: Option<String>,
    },
}

impl fmt::Display for LoadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Persisted => f.write_str("saved flights"),
            Self::Shared { timestamp: Some(ts) } => write!(f, "share link created {ts}"),
            Self::Shared { timestamp: None } => f.write_str("share link"),
        }
    }
}

/// A loaded flight list and the URL to show afterwards.
#[derive(Debug)]
pub struct Session<K: KeyValueStore> {
    /// The flight store.
    pub store: FlightStore<K>,
    /// `current_url` without its share parameter.
    pub visible_url: String,
    /// Where the flights came from.
    pub source: LoadSource,
    /// Whether the in-memory list matches what is persisted.
    pub saved: bool,
}

impl<K: KeyValueStore> Session<K> {
    /// Open the store over `kv` and apply any share link in `current_url`.
    ///
    /// A valid share payload replaces the list and is then persisted; if the
    /// write fails the imported flights are still used for this session. An
    /// invalid payload is logged and ignored, leaving the persisted list.
    pub fn load(kv: K, current_url: &str) -> Self {
        let mut store = FlightStore::open(kv);
        let visible_url = strip_share_param(current_url);

        let mut saved = true;
        let source = match decode_share_url(current_url) {
            Ok(None) => LoadSource::Persisted,
            Ok(Some(payload)) => {
                let count = payload.flights.len();
                let timestamp = Some(payload.timestamp).filter(|t| !t.is_empty());
                info!(count, "Loaded flights from share link");
                if let Err(e) = store.replace_all(payload.flights) {
                    warn!(error = %e, "Shared flights not saved");
                    saved = false;
                }
                LoadSource::Shared { timestamp }
            }
            Err(e) => {
                warn!(error = %e, "Ignoring share link");
                LoadSource::Persisted
            }
        };

        Self {
            store,
            visible_url,
            source,
            saved,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flight::fixtures;
    use crate::share::share_url;
    use crate::storage::fixtures::ReadOnlyStore;
    use crate::storage::{MemoryStore, FLIGHTS_KEY};

    fn saved(kv: &MemoryStore) {
        let flights = vec![fixtures::flight("saved", "SFO", "HND", "2023-05-05")];
        kv.set(FLIGHTS_KEY, &serde_json::to_string(&flights).unwrap())
            .unwrap();
    }

    #[test]
    fn test_plain_url_uses_persisted() {
        let kv = MemoryStore::new();
        saved(&kv);
        let session = Session::load(&kv, "http://localhost:8080/?lang=en");

        assert_eq!(session.source, LoadSource::Persisted);
        assert!(session.saved);
        assert_eq!(session.visible_url, "http://localhost:8080/?lang=en");
        assert_eq!(session.store.flights()[0].id, "saved");
    }

    #[test]
    fn test_share_link_replaces_and_persists() {
        let kv = MemoryStore::new();
        saved(&kv);
        let shared = vec![
            fixtures::flight("a", "JFK", "LHR", "2024-01-01"),
            fixtures::flight("b", "LHR", "CDG", "2024-02-01"),
        ];
        let url = share_url("http://localhost:8080/", &shared).unwrap();

        let session = Session::load(&kv, &url);
        assert!(matches!(session.source, LoadSource::Shared { timestamp: Some(_) }));
        assert_eq!(session.visible_url, "http://localhost:8080/");
        assert_eq!(session.store.flights(), shared.as_slice());

        // Replaced, not merged, and written back.
        assert!(session.saved);
        let reopened = FlightStore::open(&kv);
        assert_eq!(reopened.flights(), shared.as_slice());
    }

    #[test]
    fn test_share_link_survives_failed_write() {
        let kv = ReadOnlyStore::default();
        saved(&kv.0);
        let shared = vec![fixtures::flight("a", "JFK", "LHR", "2024-01-01")];
        let url = share_url("http://localhost:8080/", &shared).unwrap();

        let session = Session::load(&kv, &url);
        assert!(matches!(session.source, LoadSource::Shared { .. }));
        assert!(!session.saved);
        assert_eq!(session.store.flights(), shared.as_slice());

        let on_disk = FlightStore::open(&kv);
        assert_eq!(on_disk.flights()[0].id, "saved");
    }

    #[test]
    fn test_bad_share_link_falls_back() {
        let kv = MemoryStore::new();
        saved(&kv);
        let session = Session::load(&kv, "http://localhost:8080/?data=%%%garbage");

        assert_eq!(session.source, LoadSource::Persisted);
        assert_eq!(session.visible_url, "http://localhost:8080/");
        assert_eq!(session.store.len(), 1);
        assert_eq!(session.store.flights()[0].id, "saved");
    }

    #[test]
    fn test_empty_share_link_clears() {
        let kv = MemoryStore::new();
        saved(&kv);
        let url = share_url("http://localhost:8080/", &[]).unwrap();
        let session = Session::load(&kv, &url);

        assert!(matches!(session.source, LoadSource::Shared { .. }));
        assert!(session.store.is_empty());
    }

    #[test]
    fn test_load_source_display() {
        assert_eq!(LoadSource::Persisted.to_string(), "saved flights");
        assert_eq!(
            LoadSource::Shared { timestamp: None }.to_string(),
            "share link"
        );
    }
}
