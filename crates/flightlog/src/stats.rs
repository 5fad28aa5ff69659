//! Aggregate statistics over a flight list.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::flight::Flight;
use crate::geo::EARTH_CIRCUMFERENCE_MILES;

/// How many entries the "most frequent" lists keep.
pub const TOP_N: usize = 5;

/// A label and how many flights carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ranked {
    /// Airline, aircraft, route (`JFK → LHR`) or airport code.
    pub label: String,
    /// Number of flights.
    pub count: usize,
}

/// The headline facts about a single flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlightSummary {
    /// Flight id.
    pub id: String,
    /// `FROM → TO`
    pub route: String,
    /// Stored date.
    pub date: String,
    /// Miles.
    pub distance: u32,
}

impl From<&Flight> for FlightSummary {
    fn from(f: &Flight) -> Self {
        Self {
            id: f.id.clone(),
            route: f.route_label(),
            date: f.date.clone(),
            distance: f.distance,
        }
    }
}

/// Everything the stats view shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightStats {
    /// Number of flights.
    pub total_flights: usize,
    /// Sum of flight distances in miles.
    pub total_distance: u64,
    /// Mean distance, rounded; 0 for no flights.
    pub average_distance: u64,
    /// Longest flight (first logged wins ties).
    pub longest: Option<FlightSummary>,
    /// Shortest flight (first logged wins ties).
    pub shortest: Option<FlightSummary>,
    /// Distinct airport codes visited.
    pub unique_airports: usize,
    /// Distinct airlines flown.
    pub unique_airlines: usize,
    /// Distinct aircraft types flown.
    pub unique_aircraft: usize,
    /// Most frequent airlines.
    pub top_airlines: Vec<Ranked>,
    /// Most frequent aircraft types.
    pub top_aircraft: Vec<Ranked>,
    /// Most frequent directed routes.
    pub top_routes: Vec<Ranked>,
    /// Most visited airports (departures and arrivals).
    pub top_airports: Vec<Ranked>,
    /// Flights per calendar year; unparseable dates are skipped.
    pub flights_by_year: BTreeMap<i32, usize>,
    /// Earliest flight date.
    pub first_flight: Option<String>,
    /// Latest flight date.
    pub last_flight: Option<String>,
    /// Total distance as laps of the equator.
    pub times_around_earth: f64,
}

impl FlightStats {
    /// Compute statistics for `flights`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn compute(flights: &[Flight]) -> Self {
        let total_distance: u64 = flights.iter().map(|f| u64::from(f.distance)).sum();
        let count = flights.len() as u64;
        let average_distance = if count == 0 {
            0
        } else {
            (total_distance + count / 2) / count
        };

        // max_by_key/min_by_key return the last/first maximum; reverse for
        // the longest so the earliest logged flight wins either way.
        let longest = flights
            .iter()
            .rev()
            .max_by_key(|f| f.distance)
            .map(FlightSummary::from);
        let shortest = flights
            .iter()
            .min_by_key(|f| f.distance)
            .map(FlightSummary::from);

        let airports: BTreeSet<&str> = flights
            .iter()
            .flat_map(|f| [f.from.as_str(), f.to.as_str()])
            .collect();

        let mut flights_by_year = BTreeMap::new();
        for date in flights.iter().filter_map(Flight::calendar_date) {
            *flights_by_year.entry(chrono::Datelike::year(&date)).or_insert(0) += 1;
        }

        let dates: Vec<&str> = flights
            .iter()
            .filter(|f| f.calendar_date().is_some())
            .map(|f| f.date.as_str())
            .collect();

        Self {
            total_flights: flights.len(),
            total_distance,
            average_distance,
            longest,
            shortest,
            unique_airports: airports.len(),
            unique_airlines: distinct(flights.iter().map(|f| f.airline.as_str())),
            unique_aircraft: distinct(flights.iter().map(|f| f.aircraft.as_str())),
            top_airlines: top(flights.iter().map(|f| f.airline.clone())),
            top_aircraft: top(flights.iter().map(|f| f.aircraft.clone())),
            top_routes: top(flights.iter().map(Flight::route_label)),
            top_airports: top(flights
                .iter()
                .flat_map(|f| [f.from.clone(), f.to.clone()])),
            flights_by_year,
            first_flight: dates.iter().min().map(|d| (*d).to_string()),
            last_flight: dates.iter().max().map(|d| (*d).to_string()),
            times_around_earth: total_distance as f64 / EARTH_CIRCUMFERENCE_MILES,
        }
    }
}

fn distinct<'a>(labels: impl Iterator<Item = &'a str>) -> usize {
    labels.collect::<BTreeSet<_>>().len()
}

/// Count labels and keep the [`TOP_N`] most frequent, ties alphabetical.
fn top(labels: impl Iterator<Item = String>) -> Vec<Ranked> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }

    let mut ranked: Vec<Ranked> = counts
        .into_iter()
        .map(|(label, count)| Ranked { label, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    ranked.truncate(TOP_N);
    ranked
}
