//! Flight records and their validation.
//!
//! A [`Flight`] is an immutable value: edits build a fresh record from a
//! [`FlightDraft`] and replace the old one wholesale, keeping only its id.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::airports::GeocodeTable;
use crate::error::ValidationError;
use crate::geo::{distance_miles, Coordinates};

/// Storage and share format for flight dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Display format for flight dates, e.g. `Jan 1, 2024`.
pub const DISPLAY_DATE_FORMAT: &str = "%b %-d, %Y";

static AIRPORT_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{3}$").expect("static regex is valid"));

/// One logged trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
    /// Unique id, assigned at creation and never reused.
    pub id: String,
    /// Origin airport code.
    pub from: String,
    /// Destination airport code.
    pub to: String,
    /// Origin location, copied from the geocode table.
    pub from_coords: Coordinates,
    /// Destination location, copied from the geocode table.
    pub to_coords: Coordinates,
    /// Calendar date as `YYYY-MM-DD`.
    pub date: String,
    /// Aircraft type label.
    pub aircraft: String,
    /// Airline label.
    pub airline: String,
    /// Great-circle miles, rounded, computed once.
    pub distance: u32,
}

impl Flight {
    /// The flight date as a calendar date.
    ///
    /// Components are read directly, so no timezone can shift the day.
    #[must_use]
    pub fn calendar_date(&self) -> Option<NaiveDate> {
        parse_date(&self.date)
    }

    /// The date formatted for display, or the raw string if it doesn't parse.
    #[must_use]
    pub fn display_date(&self) -> String {
        display_date(&self.date)
    }

    /// `FROM → TO`
    #[must_use]
    pub fn route_label(&self) -> String {
        format!("{} → {}", self.from, self.to)
    }
}

/// Parse a `YYYY-MM-DD` date without any timezone handling.
#[must_use]
pub fn parse_date(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), DATE_FORMAT).ok()
}

/// Format a stored date string for display (`Jan 1, 2024`).
#[must_use]
pub fn display_date(date: &str) -> String {
    parse_date(date).map_or_else(
        || date.to_string(),
        |d| d.format(DISPLAY_DATE_FORMAT).to_string(),
    )
}

/// User-entered flight fields, not yet validated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlightDraft {
    /// Origin airport code.
    pub from: String,
    /// Destination airport code.
    pub to: String,
    /// Date as `YYYY-MM-DD`.
    pub date: String,
    /// Aircraft type.
    pub aircraft: String,
    /// Airline.
    pub airline: String,
}

impl FlightDraft {
    /// Draft pre-filled from an existing flight, for editing.
    #[must_use]
    pub fn from_flight(flight: &Flight) -> Self {
        Self {
            from: flight.from.clone(),
            to: flight.to.clone(),
            date: flight.date.clone(),
            aircraft: flight.aircraft.clone(),
            airline: flight.airline.clone(),
        }
    }

    /// Validate the draft and build a new flight with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for a missing field, identical
    /// endpoints, an unknown airport or a malformed date.
    pub fn build(&self, table: &GeocodeTable) -> Result<Flight, ValidationError> {
        self.build_with_id(Uuid::new_v4().to_string(), table)
    }

    /// Validate the draft and build a flight carrying `id`.
    ///
    /// Used for edits, which replace a record but keep its identity.
    ///
    /// # Errors
    ///
    /// Same as [`FlightDraft::build`].
    pub fn build_with_id(
        &self,
        id: String,
        table: &GeocodeTable,
    ) -> Result<Flight, ValidationError> {
        let from = required("from", &self.from)?.to_ascii_uppercase();
        let to = required("to", &self.to)?.to_ascii_uppercase();
        let date = required("date", &self.date)?;
        let aircraft = required("aircraft", &self.aircraft)?;
        let airline = required("airline", &self.airline)?;

        if from == to {
            return Err(ValidationError::SameAirport(from));
        }

        let date = parse_date(date)
            .ok_or_else(|| ValidationError::InvalidDate(date.to_string()))?
            .format(DATE_FORMAT)
            .to_string();

        let from_coords = resolve(&from, table)?;
        let to_coords = resolve(&to, table)?;

        Ok(Flight {
            id,
            distance: distance_miles(from_coords, to_coords),
            from,
            to,
            from_coords,
            to_coords,
            date,
            aircraft: aircraft.to_string(),
            airline: airline.to_string(),
        })
    }
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(value)
    }
}

fn resolve(code: &str, table: &GeocodeTable) -> Result<Coordinates, ValidationError> {
    if !AIRPORT_CODE.is_match(code) {
        return Err(ValidationError::UnknownAirport(code.to_string()));
    }
    table
        .lookup(code)
        .map(|airport| airport.coordinates)
        .ok_or_else(|| ValidationError::UnknownAirport(code.to_string()))
}
