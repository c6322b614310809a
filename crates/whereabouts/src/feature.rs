//! GeoJSON output.
//!
//! Only the parts of RFC 7946 the geocoder emits: `Point` and `Polygon` geometries,
//! features with free-form properties, and feature collections.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::geometry::Point;

pub const DEFAULT_ICON: &str = "point";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: [f64; 2] },
    Polygon { coordinates: Vec<Vec<[f64; 2]>> },
}

impl Geometry {
    pub const fn point(x: f64, y: f64) -> Self {
        Self::Point {
            coordinates: [x, y],
        }
    }

    pub fn polygon(exterior: Vec<[f64; 2]>) -> Self {
        Self::Polygon {
            coordinates: vec![exterior],
        }
    }
}

impl From<&Point> for Geometry {
    fn from(point: &Point) -> Self {
        Self::point(point.x, point.y)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct Feature {
    pub geometry: Option<Geometry>,
    pub properties: Map<String, Value>,
}

impl Feature {
    pub const fn new(geometry: Option<Geometry>, properties: Map<String, Value>) -> Self {
        Self {
            geometry,
            properties,
        }
    }

    pub fn from_point(point: &Point) -> Self {
        Self::new(Some(point.into()), Map::new())
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub const fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn from_point(point: &Point) -> Self {
        Self::new(vec![Feature::from_point(point)])
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl FromIterator<Feature> for FeatureCollection {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// A longitude/latitude pair as carried by client payloads. Either half may be missing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub lon: Option<f64>,
    pub lat: Option<f64>,
}

impl Location {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self {
            lon: Some(lon),
            lat: Some(lat),
        }
    }

    fn geometry(&self) -> Option<Geometry> {
        match (self.lon, self.lat) {
            (Some(lon), Some(lat)) => Some(Geometry::point(lon, lat)),
            _ => None,
        }
    }
}

/// Anything with an optional [`Location`], e.g. a search result row.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LocatedItem {
    pub location: Option<Location>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// Collection holding one point feature for `location`, tagged with `icon`.
///
/// A location missing either coordinate yields a feature with a `null` geometry.
pub fn geojson_from_location(location: &Location, icon: &str) -> FeatureCollection {
    FeatureCollection::new(vec![
        Feature::new(location.geometry(), Map::new()).with_property("icon", icon),
    ])
}

/// One point feature per item that carries a location; items without one are skipped.
pub fn geojson_from_items<'a>(items: impl IntoIterator<Item = &'a LocatedItem>) -> FeatureCollection {
    items
        .into_iter()
        .filter_map(|item| item.location.as_ref())
        .map(|location| {
            Feature::new(location.geometry(), Map::new()).with_property("icon", DEFAULT_ICON)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::crs::CrsCode;

    #[test]
    fn test_feature_serializes_as_geojson() {
        let point = Point::new(-1.4043, 50.9097, CrsCode::WGS84);
        let feature = Feature::from_point(&point).with_property("name", "Southampton");
        assert_eq!(
            serde_json::to_value(&feature).unwrap(),
            json!({
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [-1.4043, 50.9097]},
                "properties": {"name": "Southampton"}
            })
        );
    }

    #[test]
    fn test_collection_round_trips() {
        let collection = FeatureCollection::new(vec![
            Feature::new(
                Some(Geometry::polygon(vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]])),
                Map::new(),
            )
            .with_property("type", "buffer"),
        ]);
        let value = serde_json::to_value(&collection).unwrap();
        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["features"][0]["geometry"]["type"], "Polygon");

        let parsed: FeatureCollection = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, collection);
    }

    #[test]
    fn test_geojson_from_location() {
        let collection = geojson_from_location(&Location::new(-0.1276, 51.5072), "star");
        assert_eq!(collection.len(), 1);
        let feature = &collection.features[0];
        assert_eq!(feature.geometry, Some(Geometry::point(-0.1276, 51.5072)));
        assert_eq!(feature.property("icon"), Some(&json!("star")));
    }

    #[test]
    fn test_geojson_from_location_missing_coordinate() {
        let location = Location {
            lon: Some(-0.1276),
            lat: None,
        };
        let collection = geojson_from_location(&location, DEFAULT_ICON);
        assert_eq!(collection.features[0].geometry, None);
        assert_eq!(
            serde_json::to_value(&collection.features[0]).unwrap()["geometry"],
            Value::Null
        );
    }

    #[test]
    fn test_geojson_from_items_skips_unlocated() {
        let items: Vec<LocatedItem> = serde_json::from_value(json!([
            {"title": "Bargate", "location": {"lon": -1.4044, "lat": 50.9046}},
            {"title": "No fixed abode"},
            {"title": "Guildhall", "location": {"lon": -1.4080, "lat": 50.9080}}
        ]))
        .unwrap();
        assert_eq!(items[0].attributes["title"], "Bargate");

        let collection = geojson_from_items(&items);
        assert_eq!(collection.len(), 2);
        assert!(
            collection
                .features
                .iter()
                .all(|f| f.property("icon") == Some(&json!("point")))
        );
    }
}
