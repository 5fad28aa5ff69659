//! Just enough GeoJSON for the two flight layers.

use serde::{Deserialize, Serialize};

use crate::geo::Coordinates;

/// Feature geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    /// A single position.
    Point {
        /// `[lon, lat]`
        coordinates: Coordinates,
    },
    /// A polyline.
    LineString {
        /// Positions in drawing order.
        coordinates: Vec<Coordinates>,
    },
}

impl Geometry {
    /// The positions this geometry touches.
    #[must_use]
    pub fn positions(&self) -> Vec<Coordinates> {
        match self {
            Self::Point { coordinates } => vec![*coordinates],
            Self::LineString { coordinates } => coordinates.clone(),
        }
    }
}

/// A geometry with typed properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct Feature<P> {
    /// Shape.
    pub geometry: Geometry,
    /// Popup and styling data.
    pub properties: P,
}

/// An ordered set of features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection<P> {
    /// Features in render order.
    pub features: Vec<Feature<P>>,
}

impl<P> FeatureCollection<P> {
    /// A collection with no features.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            features: Vec::new(),
        }
    }

    /// Number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether there are no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl<P> Default for FeatureCollection<P> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<P> FromIterator<Feature<P>> for FeatureCollection<P> {
    fn from_iter<I: IntoIterator<Item = Feature<P>>>(iter: I) -> Self {
        Self {
            features: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Props {
        name: String,
    }

    #[test]
    fn test_point_feature_json() {
        let feature = Feature {
            geometry: Geometry::Point {
                coordinates: Coordinates::new(1.5, 2.5),
            },
            properties: Props {
                name: "p".to_string(),
            },
        };

        assert_eq!(
            serde_json::to_value(&feature).unwrap(),
            json!({
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [1.5, 2.5] },
                "properties": { "name": "p" }
            })
        );
    }

    #[test]
    fn test_empty_collection_json() {
        let fc: FeatureCollection<Props> = FeatureCollection::empty();
        assert_eq!(
            serde_json::to_value(&fc).unwrap(),
            json!({ "type": "FeatureCollection", "features": [] })
        );
        assert!(fc.is_empty());
    }

    #[test]
    fn test_line_string_parses() {
        let value = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": { "type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]] },
                "properties": { "name": "l" }
            }]
        });
        let fc: FeatureCollection<Props> = serde_json::from_value(value).unwrap();
        assert_eq!(fc.len(), 1);
        assert_eq!(
            fc.features[0].geometry.positions(),
            vec![Coordinates::new(0.0, 0.0), Coordinates::new(1.0, 1.0)]
        );
    }
}
