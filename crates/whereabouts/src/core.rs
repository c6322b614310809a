//! The single entry point for geocoding and search.
//!
//! [`LocationResolver`] owns the configuration, the gazetteer and every transformer
//! pair the operations need, all built once at construction.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use whereabouts::{LocationPayload, LocationResolver, MemoryGazetteer, CrsCode};
//! use whereabouts_data::test_data::sample_records;
//!
//! let gazetteer = MemoryGazetteer::new(sample_records(), CrsCode::WGS84)?;
//! let resolver = LocationResolver::new(Arc::new(gazetteer))?;
//!
//! let point = resolver.geocode(&LocationPayload::from_postcode("so16 7qf"))?;
//! assert!(point.is_some());
//! # Ok::<(), whereabouts::error::WhereaboutsError>(())
//! ```

use std::{ops::RangeInclusive, path::Path, sync::Arc};

use rand::RngCore;
use tracing::{debug, info, instrument};
use whereabouts_data::{GazetteerRecord, LocalType};

use crate::{
    config::GeocoderConfig,
    crs::{CrsCode, CrsTransformer, TransformerCache},
    error::{Result, WhereaboutsError},
    feature::FeatureCollection,
    gazetteer::{Gazetteer, MemoryGazetteer},
    geocode::{GeocoderChain, LocationPayload, PostcodeGeocoder},
    geometry::{BoundingBox, Point},
    grid::{GridPrecision, encode_grid_ref_with_precision},
    postcode::postcode_finder,
    search::{FreetextOptions, FreetextResponse, PlaceMatch, SpatialSearch},
};

/// Resolves payloads, postcodes, grid references and free text against one gazetteer.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
///
/// use whereabouts::{CrsCode, GeocoderConfigBuilder, LocationResolver, MemoryGazetteer};
/// use whereabouts_data::{LocalType, test_data::sample_records};
///
/// let gazetteer = Arc::new(MemoryGazetteer::new(sample_records(), CrsCode::WGS84)?);
/// let config = GeocoderConfigBuilder::web_map().build();
/// let resolver = LocationResolver::with_config(gazetteer, config)?;
///
/// let places = resolver.places_search("romsey", &[LocalType::Town])?;
/// assert_eq!(places[0].name1, "Romsey");
/// # Ok::<(), whereabouts::error::WhereaboutsError>(())
/// ```
#[derive(Clone)]
pub struct LocationResolver {
    config: Arc<GeocoderConfig>,
    gazetteer: Arc<dyn Gazetteer>,
    chain: Arc<GeocoderChain>,
    postcodes: PostcodeGeocoder,
    search: SpatialSearch,
    to_grid: Arc<CrsTransformer>,
}

impl std::fmt::Debug for LocationResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationResolver")
            .field("config", &self.config)
            .field("chain", &self.chain)
            .finish_non_exhaustive()
    }
}

impl LocationResolver {
    /// Resolver with the default configuration.
    pub fn new(gazetteer: Arc<dyn Gazetteer>) -> Result<Self> {
        Self::with_config(gazetteer, GeocoderConfig::default())
    }

    /// The gazetteer must hold its geometry in `config.search_crs`, and `config` must
    /// pass [`GeocoderConfig::validate`].
    #[instrument(name = "Build LocationResolver", skip_all, level = "info")]
    pub fn with_config(gazetteer: Arc<dyn Gazetteer>, config: GeocoderConfig) -> Result<Self> {
        config.validate()?;
        if gazetteer.crs() != config.search_crs {
            return Err(WhereaboutsError::ConfigError(format!(
                "gazetteer holds {} but search_crs is {}",
                gazetteer.crs(),
                config.search_crs
            )));
        }

        let transformers = TransformerCache::new();
        let chain = GeocoderChain::standard(Arc::clone(&gazetteer), &transformers, &config)?;
        let postcodes = PostcodeGeocoder::new(Arc::clone(&gazetteer), &transformers, &config)?;
        let to_grid = transformers.get(config.output_crs, CrsCode::BRITISH_NATIONAL_GRID)?;
        let config = Arc::new(config);
        let search = SpatialSearch::new(Arc::clone(&gazetteer), &transformers, Arc::clone(&config))?;

        info!(
            search_crs = %config.search_crs,
            output_crs = %config.output_crs,
            geocoders = ?chain.names(),
            transformers = transformers.len(),
            "LocationResolver ready"
        );
        Ok(Self {
            config,
            gazetteer,
            chain: Arc::new(chain),
            postcodes,
            search,
            to_grid,
        })
    }

    /// Load an Open Names CSV into a [`MemoryGazetteer`] held in `config.search_crs`.
    pub fn from_open_names_csv(
        path: impl AsRef<Path>,
        has_header: bool,
        config: GeocoderConfig,
    ) -> Result<Self> {
        let gazetteer = MemoryGazetteer::from_open_names_csv(path, has_header, config.search_crs)?;
        Self::with_config(Arc::new(gazetteer), config)
    }

    pub fn config(&self) -> &GeocoderConfig {
        &self.config
    }

    pub fn gazetteer(&self) -> &Arc<dyn Gazetteer> {
        &self.gazetteer
    }

    // === Point geocoding ===

    /// Locate a payload with the first strategy that applies to it.
    pub fn geocode(&self, payload: &LocationPayload) -> Result<Option<Point>> {
        Ok(self.chain.geocode(payload)?)
    }

    /// Geocode payloads in parallel. Fails on the first payload whose lookup errored.
    pub fn geocode_batch(&self, payloads: &[LocationPayload]) -> Result<Vec<Option<Point>>> {
        self.chain
            .geocode_batch(payloads)
            .into_iter()
            .map(|result| result.map_err(WhereaboutsError::from))
            .collect()
    }

    pub fn geocode_postcode(&self, postcode: &str) -> Result<Option<Point>> {
        Ok(self.postcodes.locate(postcode)?)
    }

    /// Find a full postcode anywhere in `text` and locate it.
    #[instrument(name = "Geocode Text Postcode", skip(self), level = "debug")]
    pub fn geocode_postcode_in_text(&self, text: &str) -> Result<Option<Point>> {
        let (found, candidate) = postcode_finder(text);
        if !found {
            debug!("No postcode in text");
            return Ok(None);
        }
        self.geocode_postcode(&candidate)
    }

    /// Postcode feature collection with the configured buffer, if any.
    pub fn postcode_collection(&self, postcode: &str) -> Result<Option<FeatureCollection>> {
        self.postcode_collection_with_buffer(postcode, self.config.buffer_distance)
    }

    pub fn postcode_collection_with_buffer(
        &self,
        postcode: &str,
        buffer: Option<f64>,
    ) -> Result<Option<FeatureCollection>> {
        Ok(self.postcodes.geocode_collection(postcode, buffer)?)
    }

    /// The 100 m grid reference of a point in the output CRS.
    pub fn grid_reference(&self, point: &Point) -> Result<String> {
        self.grid_reference_with_precision(point, GridPrecision::default())
    }

    pub fn grid_reference_with_precision(
        &self,
        point: &Point,
        precision: GridPrecision,
    ) -> Result<String> {
        let grid = point.transform(self.to_grid.as_ref())?;
        Ok(encode_grid_ref_with_precision(grid.x, grid.y, precision)?)
    }

    // === Search ===

    pub fn places_search(&self, query: &str, local_types: &[LocalType]) -> Result<Vec<PlaceMatch>> {
        Ok(self.search.places_search(query, local_types)?)
    }

    /// Free-text search with the configured thresholds.
    pub fn freetext(&self, text: &str, bbox: &BoundingBox) -> Result<FreetextResponse> {
        self.freetext_with_options(text, bbox, &FreetextOptions::default())
    }

    pub fn freetext_with_options(
        &self,
        text: &str,
        bbox: &BoundingBox,
        options: &FreetextOptions,
    ) -> Result<FreetextResponse> {
        Ok(self.search.freetext(text, bbox, options)?)
    }

    /// Name of the nearest postcode, or `""`.
    pub fn reverse_geocode(&self, lon: f64, lat: f64) -> Result<String> {
        Ok(self.search.reverse_geocode(lon, lat, None)?)
    }

    /// Name of the nearest place of `local_types` (any type when empty), or `""`.
    pub fn reverse_geocode_types(
        &self,
        lon: f64,
        lat: f64,
        local_types: &[LocalType],
    ) -> Result<String> {
        Ok(self.search.reverse_geocode(lon, lat, Some(local_types))?)
    }

    pub fn random_place(
        &self,
        ids: RangeInclusive<u64>,
        rng: &mut dyn RngCore,
        max_attempts: usize,
    ) -> Result<Option<GazetteerRecord>> {
        Ok(self.gazetteer.random_record(ids, rng, max_attempts)?)
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};
    use whereabouts_data::test_data::sample_records;

    use super::*;
    use crate::{GeocoderConfigBuilder, HighlightMarkers, gazetteer::testing::SpyGazetteer};

    fn resolver(config: GeocoderConfig) -> LocationResolver {
        let gazetteer = MemoryGazetteer::new(sample_records(), CrsCode::WGS84).unwrap();
        LocationResolver::with_config(Arc::new(gazetteer), config).unwrap()
    }

    #[test]
    fn test_rejects_crs_mismatch() {
        let gazetteer = MemoryGazetteer::new(sample_records(), CrsCode::WGS84).unwrap();
        let config = GeocoderConfigBuilder::new()
            .search_crs(CrsCode::BRITISH_NATIONAL_GRID)
            .build();
        assert!(matches!(
            LocationResolver::with_config(Arc::new(gazetteer), config),
            Err(WhereaboutsError::ConfigError(_))
        ));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let configs = [
            GeocoderConfigBuilder::new()
                .highlight_markers(HighlightMarkers::new("", ">>>"))
                .build(),
            GeocoderConfigBuilder::new().buffer_distance(0.0).build(),
            GeocoderConfigBuilder::new().buffer_distance(-10.0).build(),
            GeocoderConfigBuilder::new().max_bbox_area(f64::NAN).build(),
        ];
        for config in configs {
            let gazetteer = MemoryGazetteer::new(sample_records(), CrsCode::WGS84).unwrap();
            assert!(matches!(
                LocationResolver::with_config(Arc::new(gazetteer), config),
                Err(WhereaboutsError::ConfigError(_))
            ));
        }
    }

    #[test]
    fn test_grid_reference_of_point() {
        let resolver = resolver(GeocoderConfigBuilder::national_grid().build());
        let point = Point::new(438_700.0, 114_800.0, CrsCode::BRITISH_NATIONAL_GRID);
        assert_eq!(resolver.grid_reference(&point).unwrap(), "SU387148");
        assert_eq!(
            resolver
                .grid_reference_with_precision(&point, GridPrecision::Kilometre)
                .unwrap(),
            "SU3814"
        );
    }

    #[test]
    fn test_grid_reference_of_wgs84_point() {
        use crate::crs::TransformPoint;

        let resolver = resolver(GeocoderConfig::default());
        // Centre of the SU387148 square.
        let to_wgs84 = CrsTransformer::new(CrsCode::BRITISH_NATIONAL_GRID, CrsCode::WGS84).unwrap();
        let (lon, lat) = to_wgs84.transform(438_750.0, 114_850.0).unwrap();
        let point = Point::new(lon, lat, CrsCode::WGS84);
        assert_eq!(resolver.grid_reference(&point).unwrap(), "SU387148");
    }

    #[test]
    fn test_grid_reference_off_grid() {
        let resolver = resolver(GeocoderConfigBuilder::national_grid().build());
        let point = Point::new(-5.0, 100.0, CrsCode::BRITISH_NATIONAL_GRID);
        assert!(matches!(
            resolver.grid_reference(&point),
            Err(WhereaboutsError::GridError(_))
        ));
    }

    #[test]
    fn test_postcode_in_text() {
        let resolver = resolver(GeocoderConfig::default());
        let point = resolver
            .geocode_postcode_in_text("Please deliver to so16 7qf before noon")
            .unwrap()
            .unwrap();
        assert_eq!(point, Point::new(-1.4165, 50.9345, CrsCode::WGS84));

        assert!(
            resolver
                .geocode_postcode_in_text("no postcode here")
                .unwrap()
                .is_none()
        );
        assert!(
            resolver
                .geocode_postcode_in_text("somewhere in SO16")
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_configured_buffer() {
        let buffered = resolver(GeocoderConfigBuilder::new().buffer_distance(250.0).build());
        let collection = buffered.postcode_collection("SO16 7QF").unwrap().unwrap();
        assert_eq!(collection.len(), 2);

        let plain = resolver(GeocoderConfig::default());
        let collection = plain.postcode_collection("SO16 7QF").unwrap().unwrap();
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn test_batch_stops_on_failure() {
        let resolver =
            LocationResolver::new(Arc::new(SpyGazetteer::failing())).unwrap();
        let payloads = [
            LocationPayload::from_coordinates("50.9", "-1.4"),
            LocationPayload::from_postcode("SO16 7QF"),
        ];
        assert!(matches!(
            resolver.geocode_batch(&payloads),
            Err(WhereaboutsError::GeocodeError(_))
        ));
        assert_eq!(resolver.geocode_batch(&payloads[..1]).unwrap().len(), 1);
    }

    #[test]
    fn test_random_place() {
        let resolver = resolver(GeocoderConfig::default());
        let mut rng = StdRng::seed_from_u64(42);
        let record = resolver.random_place(1..=13, &mut rng, 5).unwrap();
        assert!(record.is_some());
    }
}
