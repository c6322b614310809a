use std::sync::Arc;

use tracing::debug;

use super::{LocationPayload, PointGeocoder, Result};
use crate::{
    crs::{CrsCode, CrsError, TransformPoint},
    geometry::Point,
    grid::decode_grid_ref,
};

/// National Grid references, decoded in EPSG:27700 and reprojected into the output CRS.
#[derive(Clone)]
pub struct GridRefGeocoder {
    transformer: Arc<dyn TransformPoint>,
}

impl GridRefGeocoder {
    /// `transformer` must start from British National Grid.
    pub fn new(transformer: Arc<dyn TransformPoint>) -> std::result::Result<Self, CrsError> {
        if transformer.source() != CrsCode::BRITISH_NATIONAL_GRID {
            return Err(CrsError::Mismatch {
                expected: CrsCode::BRITISH_NATIONAL_GRID,
                found: transformer.source(),
            });
        }
        Ok(Self { transformer })
    }

    /// A reference that cannot be decoded gives `Ok(None)`.
    pub fn locate(&self, gridref: &str) -> Result<Option<Point>> {
        let (easting, northing) = match decode_grid_ref(gridref) {
            Ok(decoded) => decoded,
            Err(e) => {
                debug!(gridref, error = %e, "Grid reference not decodable");
                return Ok(None);
            }
        };
        let point = Point::new(easting, northing, CrsCode::BRITISH_NATIONAL_GRID);
        Ok(Some(point.transform(self.transformer.as_ref())?))
    }
}

impl PointGeocoder for GridRefGeocoder {
    fn name(&self) -> &'static str {
        "grid reference"
    }

    fn applies_to(&self, payload: &LocationPayload) -> bool {
        payload.gridref().is_some()
    }

    fn geocode(&self, payload: &LocationPayload) -> Result<Option<Point>> {
        payload
            .gridref()
            .map_or(Ok(None), |gridref| self.locate(gridref))
    }
}
