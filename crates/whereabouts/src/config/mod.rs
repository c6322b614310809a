use serde::{Deserialize, Serialize};
use whereabouts_data::LocalType;

use crate::{crs::CrsCode, error::WhereaboutsError, gazetteer::HighlightMarkers};

/// Settings shared by every geocoding and search operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    /// CRS the gazetteer stores geometry in.
    pub search_crs: CrsCode,
    /// CRS of bounding boxes handed to free-text search.
    pub input_crs: CrsCode,
    /// CRS of raw latitude/longitude payloads.
    pub coordinate_crs: CrsCode,
    /// CRS of every point the geocoders return.
    pub output_crs: CrsCode,
    /// Metric CRS bounding-box areas are measured in.
    pub area_crs: CrsCode,
    /// Place types preferred by name search, most preferred first.
    pub default_local_types: Vec<LocalType>,
    pub min_rank: f64,
    /// Largest bounding box free-text search will scan, in square `area_crs` units.
    pub max_bbox_area: f64,
    /// Radius of the buffer drawn around a geocoded postcode, in `area_crs` units.
    pub buffer_distance: Option<f64>,
    pub name_search_limit: usize,
    pub highlight_markers: HighlightMarkers,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            search_crs: CrsCode::WGS84,
            input_crs: CrsCode::WEB_MERCATOR,
            coordinate_crs: CrsCode::WGS84,
            output_crs: CrsCode::WGS84,
            area_crs: CrsCode::WEB_MERCATOR,
            default_local_types: LocalType::default_preference(),
            min_rank: 0.03,
            max_bbox_area: 10_000.0 * 10_000.0,
            buffer_distance: None,
            name_search_limit: 50,
            highlight_markers: HighlightMarkers::default(),
        }
    }
}

/// Builder for creating geocoder configurations with ergonomic defaults
#[derive(Debug, Clone, Default)]
pub struct GeocoderConfigBuilder {
    config: GeocoderConfig,
}

impl GeocoderConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slippy-map clients: boxes and results both in Web Mercator
    pub fn web_map() -> Self {
        let mut builder = Self::new();
        builder.config.input_crs = CrsCode::WEB_MERCATOR;
        builder.config.output_crs = CrsCode::WEB_MERCATOR;
        builder
    }

    /// Results as British National Grid eastings and northings
    pub fn national_grid() -> Self {
        let mut builder = Self::new();
        builder.config.output_crs = CrsCode::BRITISH_NATIONAL_GRID;
        builder
    }

    /// Allow free-text search over boxes up to 50 km square
    pub fn wide_area() -> Self {
        let mut builder = Self::new();
        builder.config.max_bbox_area = 50_000.0 * 50_000.0;
        builder.config.name_search_limit = 200;
        builder
    }

    pub fn search_crs(mut self, crs: CrsCode) -> Self {
        self.config.search_crs = crs;
        self
    }

    pub fn input_crs(mut self, crs: CrsCode) -> Self {
        self.config.input_crs = crs;
        self
    }

    pub fn coordinate_crs(mut self, crs: CrsCode) -> Self {
        self.config.coordinate_crs = crs;
        self
    }

    pub fn output_crs(mut self, crs: CrsCode) -> Self {
        self.config.output_crs = crs;
        self
    }

    pub fn area_crs(mut self, crs: CrsCode) -> Self {
        self.config.area_crs = crs;
        self
    }

    /// Replace the preferred place types, most preferred first
    pub fn local_types(mut self, local_types: impl IntoIterator<Item = LocalType>) -> Self {
        self.config.default_local_types = local_types.into_iter().collect();
        self
    }

    pub fn min_rank(mut self, min_rank: f64) -> Self {
        self.config.min_rank = min_rank;
        self
    }

    pub fn max_bbox_area(mut self, area: f64) -> Self {
        self.config.max_bbox_area = area;
        self
    }

    pub fn buffer_distance(mut self, distance: f64) -> Self {
        self.config.buffer_distance = Some(distance);
        self
    }

    pub fn name_search_limit(mut self, limit: usize) -> Self {
        self.config.name_search_limit = limit;
        self
    }

    pub fn highlight_markers(mut self, markers: HighlightMarkers) -> Self {
        self.config.highlight_markers = markers;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> GeocoderConfig {
        self.config
    }

    /// Build, rejecting values no search could run with
    pub fn build_validated(self) -> Result<GeocoderConfig, WhereaboutsError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl GeocoderConfig {
    /// Reject values no search could run with.
    pub fn validate(&self) -> Result<(), WhereaboutsError> {
        if !(self.max_bbox_area.is_finite() && self.max_bbox_area > 0.0) {
            return Err(WhereaboutsError::ConfigError(format!(
                "max_bbox_area must be positive, got {}",
                self.max_bbox_area
            )));
        }
        if !self.min_rank.is_finite() || self.min_rank < 0.0 {
            return Err(WhereaboutsError::ConfigError(format!(
                "min_rank must not be negative, got {}",
                self.min_rank
            )));
        }
        if let Some(distance) = self.buffer_distance
            && !(distance.is_finite() && distance > 0.0)
        {
            return Err(WhereaboutsError::ConfigError(format!(
                "buffer_distance must be positive, got {distance}"
            )));
        }
        if self.highlight_markers.start.is_empty() || self.highlight_markers.stop.is_empty() {
            return Err(WhereaboutsError::ConfigError(
                "highlight markers must not be empty".to_owned(),
            ));
        }
        Ok(())
    }
}
