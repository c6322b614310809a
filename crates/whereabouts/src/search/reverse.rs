use tracing::{debug, instrument};
use whereabouts_data::LocalType;

use super::{Result, SpatialSearch};
use crate::geometry::Point;

impl SpatialSearch {
    /// Name of the nearest place to `(lon, lat)`, or an empty string when nothing qualifies.
    ///
    /// Coordinates are in the configured coordinate CRS. `None` looks for postcodes only;
    /// an empty slice accepts every place type.
    #[instrument(name = "Reverse Geocode", skip(self), level = "debug")]
    pub fn reverse_geocode(
        &self,
        lon: f64,
        lat: f64,
        local_types: Option<&[LocalType]>,
    ) -> Result<String> {
        let point = Point::new(lon, lat, self.config.coordinate_crs)
            .transform(self.coordinate_to_search.as_ref())?;
        let nearest = match local_types {
            Some(local_types) => self.gazetteer.nearest(&point, local_types)?,
            None => self.gazetteer.nearest(&point, &[LocalType::Postcode])?,
        };
        debug!(found = nearest.is_some(), "Reverse geocode complete");
        Ok(nearest.map(|record| record.name1).unwrap_or_default())
    }
}
