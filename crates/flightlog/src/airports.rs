//! Geocode table: airport code to name, city and coordinates.
//!
//! Coordinates are copied out of this table when a flight is created or
//! edited. Existing flights are never re-geocoded.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::geo::Coordinates;

/// A known airport.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Airport {
    /// IATA code, uppercase.
    pub code: String,
    /// Airport name.
    pub name: String,
    /// City served.
    pub city: String,
    /// Location as `[lon, lat]`.
    pub coordinates: Coordinates,
}

/// (code, name, city, lon, lat)
const BUILTIN_AIRPORTS: &[(&str, &str, &str, f64, f64)] = &[
    ("ATL", "Hartsfield-Jackson Atlanta International", "Atlanta", -84.4281, 33.6407),
    ("LAX", "Los Angeles International", "Los Angeles", -118.4085, 33.9416),
    ("ORD", "O'Hare International", "Chicago", -87.9073, 41.9742),
    ("DFW", "Dallas/Fort Worth International", "Dallas", -97.0403, 32.8998),
    ("DEN", "Denver International", "Denver", -104.6737, 39.8561),
    ("JFK", "John F. Kennedy International", "New York", -73.7781, 40.6413),
    ("EWR", "Newark Liberty International", "Newark", -74.1745, 40.6895),
    ("LGA", "LaGuardia", "New York", -73.8740, 40.7769),
    ("SFO", "San Francisco International", "San Francisco", -122.3790, 37.6213),
    ("SEA", "Seattle-Tacoma International", "Seattle", -122.3088, 47.4502),
    ("LAS", "Harry Reid International", "Las Vegas", -115.1537, 36.0840),
    ("MCO", "Orlando International", "Orlando", -81.3081, 28.4312),
    ("MIA", "Miami International", "Miami", -80.2870, 25.7959),
    ("BOS", "Logan International", "Boston", -71.0096, 42.3656),
    ("IAD", "Washington Dulles International", "Washington", -77.4565, 38.9531),
    ("PHX", "Phoenix Sky Harbor International", "Phoenix", -112.0116, 33.4352),
    ("IAH", "George Bush Intercontinental", "Houston", -95.3414, 29.9902),
    ("MSP", "Minneapolis-Saint Paul International", "Minneapolis", -93.2218, 44.8848),
    ("HNL", "Daniel K. Inouye International", "Honolulu", -157.9251, 21.3245),
    ("ANC", "Ted Stevens Anchorage International", "Anchorage", -149.9961, 61.1743),
    ("YYZ", "Toronto Pearson International", "Toronto", -79.6248, 43.6777),
    ("YVR", "Vancouver International", "Vancouver", -123.1779, 49.1967),
    ("YUL", "Montréal-Trudeau International", "Montreal", -73.7408, 45.4706),
    ("MEX", "Mexico City International", "Mexico City", -99.0721, 19.4361),
    ("CUN", "Cancún International", "Cancún", -86.8771, 21.0365),
    ("GRU", "São Paulo/Guarulhos International", "São Paulo", -46.4731, -23.4356),
    ("EZE", "Ministro Pistarini International", "Buenos Aires", -58.5358, -34.8222),
    ("BOG", "El Dorado International", "Bogotá", -74.1469, 4.7016),
    ("SCL", "Arturo Merino Benítez International", "Santiago", -70.7858, -33.3930),
    ("LIM", "Jorge Chávez International", "Lima", -77.1143, -12.0219),
    ("LHR", "Heathrow", "London", -0.4543, 51.4700),
    ("LGW", "Gatwick", "London", -0.1821, 51.1537),
    ("CDG", "Charles de Gaulle", "Paris", 2.5479, 49.0097),
    ("AMS", "Schiphol", "Amsterdam", 4.7683, 52.3105),
    ("FRA", "Frankfurt am Main", "Frankfurt", 8.5622, 50.0379),
    ("MUC", "Munich", "Munich", 11.7861, 48.3537),
    ("MAD", "Adolfo Suárez Madrid-Barajas", "Madrid", -3.5676, 40.4983),
    ("BCN", "Josep Tarradellas Barcelona-El Prat", "Barcelona", 2.0785, 41.2974),
    ("FCO", "Leonardo da Vinci-Fiumicino", "Rome", 12.2389, 41.8003),
    ("ZRH", "Zurich", "Zurich", 8.5555, 47.4582),
    ("VIE", "Vienna International", "Vienna", 16.5697, 48.1103),
    ("CPH", "Copenhagen", "Copenhagen", 12.6508, 55.6180),
    ("ARN", "Stockholm Arlanda", "Stockholm", 17.9186, 59.6498),
    ("OSL", "Oslo Gardermoen", "Oslo", 11.1004, 60.1976),
    ("HEL", "Helsinki-Vantaa", "Helsinki", 24.9633, 60.3172),
    ("DUB", "Dublin", "Dublin", -6.2499, 53.4264),
    ("LIS", "Humberto Delgado", "Lisbon", -9.1354, 38.7742),
    ("IST", "Istanbul", "Istanbul", 28.7519, 41.2753),
    ("ATH", "Athens International", "Athens", 23.9484, 37.9356),
    ("KEF", "Keflavík International", "Reykjavík", -22.6056, 63.9850),
    ("DXB", "Dubai International", "Dubai", 55.3657, 25.2532),
    ("DOH", "Hamad International", "Doha", 51.6138, 25.2731),
    ("CAI", "Cairo International", "Cairo", 31.4056, 30.1219),
    ("JNB", "O. R. Tambo International", "Johannesburg", 28.2460, -26.1367),
    ("CPT", "Cape Town International", "Cape Town", 18.6017, -33.9715),
    ("NBO", "Jomo Kenyatta International", "Nairobi", 36.9278, -1.3192),
    ("DEL", "Indira Gandhi International", "Delhi", 77.1031, 28.5562),
    ("BOM", "Chhatrapati Shivaji Maharaj International", "Mumbai", 72.8679, 19.0896),
    ("SIN", "Changi", "Singapore", 103.9915, 1.3644),
    ("BKK", "Suvarnabhumi", "Bangkok", 100.7501, 13.6900),
    ("KUL", "Kuala Lumpur International", "Kuala Lumpur", 101.7099, 2.7456),
    ("HKG", "Hong Kong International", "Hong Kong", 113.9185, 22.3080),
    ("PEK", "Beijing Capital International", "Beijing", 116.5975, 40.0799),
    ("PVG", "Shanghai Pudong International", "Shanghai", 121.8083, 31.1443),
    ("ICN", "Incheon International", "Seoul", 126.4407, 37.4602),
    ("HND", "Haneda", "Tokyo", 139.7798, 35.5494),
    ("NRT", "Narita International", "Tokyo", 140.3929, 35.7720),
    ("KIX", "Kansai International", "Osaka", 135.2380, 34.4320),
    ("TPE", "Taoyuan International", "Taipei", 121.2332, 25.0797),
    ("MNL", "Ninoy Aquino International", "Manila", 121.0198, 14.5086),
    ("SYD", "Kingsford Smith", "Sydney", 151.1772, -33.9399),
    ("MEL", "Melbourne", "Melbourne", 144.8410, -37.6690),
    ("BNE", "Brisbane", "Brisbane", 153.1175, -27.3842),
    ("PER", "Perth", "Perth", 115.9669, -31.9385),
    ("AKL", "Auckland", "Auckland", 174.7850, -37.0082),
];

/// Lookup table of known airports keyed by uppercase code.
#[derive(Debug, Clone, Default)]
pub struct GeocodeTable {
    airports: BTreeMap<String, Airport>,
}

impl GeocodeTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in table of major airports.
    #[must_use]
    pub fn builtin() -> Self {
        BUILTIN_AIRPORTS
            .iter()
            .map(|&(code, name, city, lon, lat)| Airport {
                code: code.to_string(),
                name: name.to_string(),
                city: city.to_string(),
                coordinates: Coordinates::new(lon, lat),
            })
            .collect()
    }

    /// Add or replace an airport.
    pub fn insert(&mut self, airport: Airport) {
        let code = airport.code.to_ascii_uppercase();
        self.airports.insert(code, airport);
    }

    /// Look up an airport by code, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn lookup(&self, code: &str) -> Option<&Airport> {
        self.airports.get(&code.trim().to_ascii_uppercase())
    }

    /// Airports whose code, name or city contains `query`, case-insensitively.
    ///
    /// Results are in code order. An empty query matches everything.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<&Airport> {
        let needle = query.trim().to_lowercase();
        self.airports
            .values()
            .filter(|a| {
                needle.is_empty()
                    || a.code.to_lowercase().contains(&needle)
                    || a.name.to_lowercase().contains(&needle)
                    || a.city.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Number of airports in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.airports.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.airports.is_empty()
    }
}

impl FromIterator<Airport> for GeocodeTable {
    fn from_iter<I: IntoIterator<Item = Airport>>(iter: I) -> Self {
        let mut table = Self::new();
        for airport in iter {
            table.insert(airport);
        }
        table
    }
}
