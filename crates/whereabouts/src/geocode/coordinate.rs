use std::sync::Arc;

use tracing::debug;

use super::{LocationPayload, PointGeocoder, Result};
use crate::{
    crs::{CrsCode, CrsError, CrsTransformer, TransformPoint},
    geometry::Point,
};

/// Raw longitude/latitude (or x/y) strings, reprojected into the output CRS.
#[derive(Clone)]
pub struct CoordinateGeocoder {
    transformer: Arc<dyn TransformPoint>,
}

impl CoordinateGeocoder {
    pub fn new(transformer: Arc<dyn TransformPoint>) -> Self {
        Self { transformer }
    }

    /// Build from CRS identifiers such as `"EPSG:4326"`.
    pub fn from_identifiers(
        input_crs: &str,
        output_crs: &str,
    ) -> std::result::Result<Self, CrsError> {
        let transformer =
            CrsTransformer::new(CrsCode::parse(input_crs)?, CrsCode::parse(output_crs)?)?;
        Ok(Self::new(Arc::new(transformer)))
    }

    /// Locate `x`/`y` given as text. Text that is not a number gives `Ok(None)`.
    pub fn locate(&self, x: &str, y: &str) -> Result<Option<Point>> {
        let (Ok(x), Ok(y)) = (x.trim().parse::<f64>(), y.trim().parse::<f64>()) else {
            debug!(x, y, "Coordinates are not numeric");
            return Ok(None);
        };
        let point = Point::new(x, y, self.transformer.source());
        Ok(Some(point.transform(self.transformer.as_ref())?))
    }
}

impl PointGeocoder for CoordinateGeocoder {
    fn name(&self) -> &'static str {
        "coordinates"
    }

    fn applies_to(&self, payload: &LocationPayload) -> bool {
        payload.latitude().is_some() && payload.longitude().is_some()
    }

    fn geocode(&self, payload: &LocationPayload) -> Result<Option<Point>> {
        match (payload.longitude(), payload.latitude()) {
            (Some(lon), Some(lat)) => self.locate(lon, lat),
            _ => Ok(None),
        }
    }
}
