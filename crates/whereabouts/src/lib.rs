//! Whereabouts - UK Location Resolution
//!
//! Whereabouts turns the ways people describe a place in Great Britain into points and
//! ranked place matches: raw coordinates in any supported CRS, Ordnance Survey National
//! Grid references, postcodes, place names and free text.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use whereabouts::{CrsCode, LocationPayload, LocationResolver, MemoryGazetteer};
//! use whereabouts_data::test_data::sample_records;
//!
//! let gazetteer = MemoryGazetteer::new(sample_records(), CrsCode::WGS84)?;
//! let resolver = LocationResolver::new(Arc::new(gazetteer))?;
//!
//! // Coordinates win over a grid reference, which wins over a postcode.
//! let payload = LocationPayload::from_gridref("SU 387 148").with_postcode("SO16 7QF");
//! let point = resolver.geocode(&payload)?.expect("grid reference decodes");
//! println!("{point:?}");
//!
//! // Nearest postcode to a longitude/latitude.
//! let postcode = resolver.reverse_geocode(-1.41, 50.93)?;
//! assert_eq!(postcode, "SO16 7QF");
//! # Ok::<(), whereabouts::error::WhereaboutsError>(())
//! ```
//!
//! # Features
//!
//! - **Point geocoding**: coordinates, grid references and postcodes behind one dispatch chain
//! - **CRS handling**: WGS84, ETRS89, OSGB36, Web Mercator and British National Grid
//! - **National Grid codec**: decode any even-length reference, encode from 1 m to 10 km
//! - **Place search**: Tantivy-backed name search ordered by place-type preference
//! - **Free-text search**: find places named in a passage inside an area-capped bounding box
//! - **GeoJSON output**: features and collections ready for a map client
//!
//! # Data
//!
//! Gazetteers are pluggable through the [`Gazetteer`] trait. [`MemoryGazetteer`] loads the
//! Ordnance Survey Open Names CSV product, reprojecting it from EPSG:27700 on the way in.
use once_cell::sync::OnceCell;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod config;
mod core;
mod crs;
pub mod error;
mod feature;
mod gazetteer;
mod geocode;
mod geometry;
mod grid;
mod index;
mod postcode;
mod search;

pub use crate::core::LocationResolver;

pub use config::{GeocoderConfig, GeocoderConfigBuilder};
pub use crs::{
    CrsCode, CrsError, CrsRegistry, CrsTransformer, TransformPoint, TransformerCache,
    resolve_numeric_code, transform_point,
};
pub use feature::{
    DEFAULT_ICON, Feature, FeatureCollection, Geometry, LocatedItem, Location, geojson_from_items,
    geojson_from_location,
};
pub use gazetteer::{
    Gazetteer, GazetteerError, HighlightMarkers, MemoryGazetteer, NameQuery, RankedRecord,
    TextMatch, TextQuery,
};
pub use geocode::{
    CoordinateGeocoder, GeocodeError, GeocoderChain, GridRefGeocoder, LocationPayload,
    PointGeocoder, PostcodeGeocoder,
};
pub use geometry::{BoundingBox, Point, buffer_ring};
pub use grid::{
    GridCell, GridError, GridPrecision, GridReference, decode_grid_ref, encode_grid_ref,
    encode_grid_ref_with_precision,
};
pub use index::{IndexError, NameIndex};
pub use postcode::{format_postcode, postcode_finder};
pub use search::{
    FreetextOptions, FreetextResponse, PlaceMatch, SearchError, SpatialSearch,
};
pub use whereabouts_data as data;

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Initialize logging for the Whereabouts library.
///
/// Sets up a `tracing` subscriber filtered by `RUST_LOG` when present, otherwise by
/// `level`. Calling it again is a no-op.
///
/// # Examples
///
/// ```rust
/// use tracing::Level;
/// use whereabouts::init_logging;
///
/// init_logging(Level::INFO)?;
/// # Ok::<(), whereabouts::error::WhereaboutsError>(())
/// ```
pub fn init_logging(level: impl Into<LevelFilter>) -> Result<&'static (), error::WhereaboutsError> {
    LOGGER_INIT.get_or_try_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level.into().to_string()))?
            .add_directive("tantivy=warn".parse()?);

        tracing_subscriber::fmt::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .init();
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use whereabouts_data::{LocalType, test_data::sample_records};

    use super::*;

    fn setup_test_env() {
        let _ = init_logging(tracing::Level::WARN);
    }

    fn resolver() -> LocationResolver {
        let gazetteer = MemoryGazetteer::new(sample_records(), CrsCode::WGS84).unwrap();
        LocationResolver::new(Arc::new(gazetteer)).unwrap()
    }

    #[test]
    fn test_logging_initializes_once() {
        setup_test_env();
        assert!(init_logging(tracing::Level::DEBUG).is_ok());
    }

    #[test]
    fn test_resolver_creation() {
        setup_test_env();
        let resolver = resolver();
        assert_eq!(resolver.config().search_crs, CrsCode::WGS84);
    }

    #[test]
    fn test_dispatch_priority() {
        setup_test_env();
        let resolver = resolver();

        let payload = LocationPayload::from_coordinates("50.93", "-1.45").with_gridref("TQ300800");
        let point = resolver.geocode(&payload).unwrap().unwrap();
        assert_eq!(point, Point::new(-1.45, 50.93, CrsCode::WGS84));

        let payload = LocationPayload::from_gridref("SU387148").with_postcode("SW1A 1AA");
        let point = resolver.geocode(&payload).unwrap().unwrap();
        assert!((point.x - -1.45).abs() < 0.02);

        assert!(resolver.geocode(&LocationPayload::default()).unwrap().is_none());
    }

    #[test]
    fn test_places_and_reverse() {
        setup_test_env();
        let resolver = resolver();

        let places = resolver.places_search("southampton", &[]).unwrap();
        assert_eq!(places[0].name1, "Southampton");
        assert_eq!(places[0].local_type, LocalType::City);

        assert_eq!(resolver.reverse_geocode(-0.14, 51.50).unwrap(), "SW1A 1AA");
        assert_eq!(
            resolver
                .reverse_geocode_types(-0.14, 51.50, &[LocalType::City])
                .unwrap(),
            "London"
        );
    }

    #[test]
    fn test_oversized_box_payload() {
        setup_test_env();
        let resolver = resolver();
        let bbox = BoundingBox::new(0.0, 0.0, 50_000.0, 50_000.0, CrsCode::WEB_MERCATOR);

        let err = resolver.freetext("Romsey", &bbox).unwrap_err();
        let payload = err.error_payload().expect("oversized boxes carry a payload");
        assert_eq!(payload["error"], "bbox too large");
        assert!((payload["area"].as_f64().unwrap() - 2.5e9).abs() < 1.0);
    }
}
