//! Pure projections from a flight snapshot to the two layer collections.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::geojson::{Feature, FeatureCollection, Geometry};
use crate::flight::Flight;

/// Properties attached to each route line, enough to render its popup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteProperties {
    /// Id of the flight this line draws.
    pub flight_id: String,
    /// Origin code.
    pub from: String,
    /// Destination code.
    pub to: String,
    /// Airline label.
    pub airline: String,
    /// Aircraft label.
    pub aircraft: String,
    /// Stored `YYYY-MM-DD` date.
    pub date: String,
}

/// Whether an airport point came from a departure or an arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AirportRole {
    /// The flight's origin.
    Departure,
    /// The flight's destination.
    Arrival,
}

impl fmt::Display for AirportRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Departure => write!(f, "Departure"),
            Self::Arrival => write!(f, "Arrival"),
        }
    }
}

/// Properties attached to each airport point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirportProperties {
    /// Airport code.
    pub code: String,
    /// Role in the first flight that placed this point.
    #[serde(rename = "type")]
    pub role: AirportRole,
    /// Id of that flight.
    pub flight_id: String,
}

/// One line per flight from origin to destination, in input order.
#[must_use]
pub fn project_routes(flights: &[Flight]) -> FeatureCollection<RouteProperties> {
    flights
        .iter()
        .map(|f| Feature {
            geometry: Geometry::LineString {
                coordinates: vec![f.from_coords, f.to_coords],
            },
            properties: RouteProperties {
                flight_id: f.id.clone(),
                from: f.from.clone(),
                to: f.to.clone(),
                airline: f.airline.clone(),
                aircraft: f.aircraft.clone(),
                date: f.date.clone(),
            },
        })
        .collect()
}

/// Departure and arrival points for every flight, de-duplicated by exact
/// coordinates.
///
/// Points are visited departure-then-arrival per flight in input order and
/// the first point at a location wins, whatever its role.
#[must_use]
pub fn project_airports(flights: &[Flight]) -> FeatureCollection<AirportProperties> {
    let mut seen = HashSet::with_capacity(flights.len() * 2);

    flights
        .iter()
        .flat_map(|f| {
            [
                (f.from_coords, &f.from, AirportRole::Departure, &f.id),
                (f.to_coords, &f.to, AirportRole::Arrival, &f.id),
            ]
        })
        .filter(|(coords, ..)| seen.insert(coords.exact_key()))
        .map(|(coords, code, role, flight_id)| Feature {
            geometry: Geometry::Point {
                coordinates: coords,
            },
            properties: AirportProperties {
                code: code.clone(),
                role,
                flight_id: flight_id.clone(),
            },
        })
        .collect()
}
