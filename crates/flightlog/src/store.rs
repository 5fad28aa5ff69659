//! The flight store: the ordered list of flights plus its persistence.
//!
//! Every mutation validates first, then replaces the in-memory list, writes
//! the whole list back under [`FLIGHTS_KEY`], and hands the new snapshot to
//! subscribers. Records are never modified in place. A share import is the
//! exception: it is adopted and announced first, then written.

use std::fmt;

use tracing::{debug, info, warn};

use crate::airports::GeocodeTable;
use crate::error::{Error, Result};
use crate::flight::{Flight, FlightDraft};
use crate::storage::{KeyValueStore, FLIGHTS_KEY};

/// Callback invoked with the full flight list after each change.
pub type Listener = Box<dyn FnMut(&[Flight])>;

/// Ordered, persisted list of flights.
pub struct FlightStore<K: KeyValueStore> {
    kv: K,
    flights: Vec<Flight>,
    listeners: Vec<Listener>,
}

impl<K: KeyValueStore> fmt::Debug for FlightStore<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlightStore")
            .field("flights", &self.flights.len())
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl<K: KeyValueStore> FlightStore<K> {
    /// Open the store, loading any persisted flights.
    ///
    /// Unreadable or corrupt data is logged and treated as an empty list.
    pub fn open(kv: K) -> Self {
        let flights = load_flights(&kv);
        Self {
            kv,
            flights,
            listeners: Vec::new(),
        }
    }

    /// All flights in insertion order.
    #[must_use]
    pub fn flights(&self) -> &[Flight] {
        &self.flights
    }

    /// An owned copy of the current list.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Flight> {
        self.flights.clone()
    }

    /// Flights sorted newest first; ties keep insertion order.
    #[must_use]
    pub fn sorted_by_date(&self) -> Vec<&Flight> {
        let mut sorted: Vec<&Flight> = self.flights.iter().collect();
        sorted.sort_by(|a, b| b.date.cmp(&a.date));
        sorted
    }

    /// Find a flight by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Flight> {
        self.flights.iter().find(|f| f.id == id)
    }

    /// Number of flights.
    #[must_use]
    pub fn len(&self) -> usize {
        self.flights.len()
    }

    /// Whether there are no flights.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flights.is_empty()
    }

    /// The underlying key/value store.
    #[must_use]
    pub fn kv(&self) -> &K {
        &self.kv
    }

    /// Register a listener for list changes.
    pub fn subscribe(&mut self, listener: impl FnMut(&[Flight]) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Validate and append a new flight.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] without changing anything if the draft is
    /// invalid, or a storage error if persisting fails.
    pub fn add(&mut self, draft: &FlightDraft, table: &GeocodeTable) -> Result<Flight> {
        let flight = draft.build(table)?;
        let mut next = self.flights.clone();
        next.push(flight.clone());
        self.commit(next)?;
        info!(id = %flight.id, route = %flight.route_label(), "Added flight");
        Ok(flight)
    }

    /// Replace the flight with `id` by a record built from `draft`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FlightNotFound`] for an unknown id,
    /// [`Error::Validation`] for an invalid draft, or a storage error.
    pub fn update(&mut self, id: &str, draft: &FlightDraft, table: &GeocodeTable) -> Result<Flight> {
        let index = self.index_of(id)?;
        let flight = draft.build_with_id(id.to_string(), table)?;
        let mut next = self.flights.clone();
        next[index] = flight.clone();
        self.commit(next)?;
        info!(id, route = %flight.route_label(), "Updated flight");
        Ok(flight)
    }

    /// Remove the flight with `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FlightNotFound`] for an unknown id, or a storage error.
    pub fn remove(&mut self, id: &str) -> Result<Flight> {
        let index = self.index_of(id)?;
        let mut next = self.flights.clone();
        let removed = next.remove(index);
        self.commit(next)?;
        info!(id, "Removed flight");
        Ok(removed)
    }

    /// Remove every flight.
    ///
    /// # Errors
    ///
    /// Returns a storage error if persisting fails.
    pub fn clear(&mut self) -> Result<()> {
        self.commit(Vec::new())?;
        info!("Cleared all flights");
        Ok(())
    }

    /// Replace the whole list with flights imported from a share link.
    ///
    /// Unlike the other mutations, the new list is adopted and handed to
    /// subscribers before it is written, so a failed write leaves the
    /// imported flights in memory for this session.
    ///
    /// # Errors
    ///
    /// Returns a storage error if persisting fails.
    pub fn replace_all(&mut self, flights: Vec<Flight>) -> Result<()> {
        let count = flights.len();
        self.flights = flights;
        self.notify();
        self.persist(&self.flights)?;
        info!(count, "Replaced flight list");
        Ok(())
    }

    fn index_of(&self, id: &str) -> Result<usize> {
        self.flights
            .iter()
            .position(|f| f.id == id)
            .ok_or_else(|| Error::flight_not_found(id))
    }

    fn commit(&mut self, flights: Vec<Flight>) -> Result<()> {
        self.persist(&flights)?;
        self.flights = flights;
        self.notify();
        Ok(())
    }

    fn persist(&self, flights: &[Flight]) -> Result<()> {
        let json = serde_json::to_string(flights)?;
        self.kv.set(FLIGHTS_KEY, &json)
    }

    fn notify(&mut self) {
        debug!(
            count = self.flights.len(),
            listeners = self.listeners.len(),
            "Notifying listeners"
        );
        for listener in &mut self.listeners {
            listener(&self.flights);
        }
    }
}

/// Read the persisted flight list, degrading to empty on any problem.
fn load_flights(kv: &impl KeyValueStore) -> Vec<Flight> {
    let raw = match kv.get(FLIGHTS_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!(error = %e, "Could not read saved flights, starting empty");
            return Vec::new();
        }
    };

    match serde_json::from_str::<Vec<Flight>>(&raw) {
        Ok(flights) => {
            debug!(count = flights.len(), "Loaded saved flights");
            flights
        }
        Err(e) => {
            warn!(error = %e, "Saved flights are corrupt, starting empty");
            Vec::new()
        }
    }
}
