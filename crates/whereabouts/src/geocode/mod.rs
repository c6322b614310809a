//! Turning a location payload into a single point.
//!
//! Each way of locating something (raw coordinates, a grid reference, a postcode) is a
//! [`PointGeocoder`]. A [`GeocoderChain`] holds them in priority order and hands a payload
//! to the first one that applies; later strategies are never consulted, even when the
//! chosen one finds nothing.

mod coordinate;
mod grid_ref;
mod postcode;

use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

pub use coordinate::CoordinateGeocoder;
pub use error::GeocodeError;
use error::Result;
pub use grid_ref::GridRefGeocoder;
pub use postcode::PostcodeGeocoder;

use crate::{
    config::GeocoderConfig,
    crs::{CrsCode, CrsError, TransformerCache},
    gazetteer::Gazetteer,
    geometry::Point,
};

/// The location fields a client may send. Blank strings count as missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationPayload {
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub gridref: Option<String>,
    pub locationpostcode: Option<String>,
}

fn present(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

impl LocationPayload {
    pub fn from_coordinates(latitude: impl Into<String>, longitude: impl Into<String>) -> Self {
        Self {
            latitude: Some(latitude.into()),
            longitude: Some(longitude.into()),
            ..Self::default()
        }
    }

    pub fn from_gridref(gridref: impl Into<String>) -> Self {
        Self {
            gridref: Some(gridref.into()),
            ..Self::default()
        }
    }

    pub fn from_postcode(postcode: impl Into<String>) -> Self {
        Self {
            locationpostcode: Some(postcode.into()),
            ..Self::default()
        }
    }

    pub fn with_gridref(mut self, gridref: impl Into<String>) -> Self {
        self.gridref = Some(gridref.into());
        self
    }

    pub fn with_postcode(mut self, postcode: impl Into<String>) -> Self {
        self.locationpostcode = Some(postcode.into());
        self
    }

    pub fn latitude(&self) -> Option<&str> {
        present(self.latitude.as_ref())
    }

    pub fn longitude(&self) -> Option<&str> {
        present(self.longitude.as_ref())
    }

    pub fn gridref(&self) -> Option<&str> {
        present(self.gridref.as_ref())
    }

    pub fn postcode(&self) -> Option<&str> {
        present(self.locationpostcode.as_ref())
    }
}

/// One strategy for locating a payload.
pub trait PointGeocoder: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the payload carries the fields this strategy reads.
    fn applies_to(&self, payload: &LocationPayload) -> bool;

    /// `Ok(None)` when the fields are present but do not resolve to a point.
    fn geocode(&self, payload: &LocationPayload) -> Result<Option<Point>>;
}

/// Strategies in priority order.
#[derive(Default)]
pub struct GeocoderChain {
    geocoders: Vec<Box<dyn PointGeocoder>>,
}

impl std::fmt::Debug for GeocoderChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.geocoders.iter().map(|g| g.name()))
            .finish()
    }
}

impl GeocoderChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a strategy after those already in the chain.
    pub fn with(mut self, geocoder: impl PointGeocoder + 'static) -> Self {
        self.geocoders.push(Box::new(geocoder));
        self
    }

    /// Coordinates, then grid reference, then postcode.
    pub fn standard(
        gazetteer: Arc<dyn Gazetteer>,
        transformers: &TransformerCache,
        config: &GeocoderConfig,
    ) -> std::result::Result<Self, CrsError> {
        let output = config.output_crs;
        Ok(Self::new()
            .with(CoordinateGeocoder::new(
                transformers.get(config.coordinate_crs, output)?,
            ))
            .with(GridRefGeocoder::new(
                transformers.get(CrsCode::BRITISH_NATIONAL_GRID, output)?,
            )?)
            .with(PostcodeGeocoder::new(gazetteer, transformers, config)?))
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.geocoders.iter().map(|g| g.name()).collect()
    }

    /// Run the first applicable strategy. `Ok(None)` when none applies.
    #[instrument(name = "Geocode Payload", skip_all, level = "debug")]
    pub fn geocode(&self, payload: &LocationPayload) -> Result<Option<Point>> {
        let Some(geocoder) = self.geocoders.iter().find(|g| g.applies_to(payload)) else {
            debug!("No geocoder applies to payload");
            return Ok(None);
        };
        let point = geocoder.geocode(payload)?;
        debug!(
            geocoder = geocoder.name(),
            found = point.is_some(),
            "Geocoded payload"
        );
        Ok(point)
    }

    /// Geocode many payloads in parallel. Results line up with the input.
    #[instrument(name = "Geocode Batch", skip_all, fields(payloads = payloads.len()))]
    pub fn geocode_batch(&self, payloads: &[LocationPayload]) -> Vec<Result<Option<Point>>> {
        let results: Vec<_> = payloads
            .par_iter()
            .map(|payload| self.geocode(payload))
            .collect();
        info!(
            located = results.iter().filter(|r| matches!(r, Ok(Some(_)))).count(),
            "Batch geocoding complete"
        );
        results
    }
}

mod error {
    use thiserror::Error;

    use crate::{crs::CrsError, gazetteer::GazetteerError};

    #[derive(Error, Debug)]
    pub enum GeocodeError {
        #[error("CRS error: {0}")]
        Crs(#[from] CrsError),
        #[error("Gazetteer error: {0}")]
        Gazetteer(#[from] GazetteerError),
    }

    pub type Result<T> = std::result::Result<T, GeocodeError>;
}
