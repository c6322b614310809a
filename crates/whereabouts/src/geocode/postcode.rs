use std::sync::Arc;

use tracing::{debug, instrument};
use whereabouts_data::{GazetteerRecord, LocalType};

use super::{LocationPayload, PointGeocoder, Result};
use crate::{
    config::GeocoderConfig,
    crs::{CrsError, TransformPoint, TransformerCache},
    feature::{Feature, FeatureCollection, Geometry},
    gazetteer::Gazetteer,
    geometry::{Point, buffer_ring},
    postcode::format_postcode,
};

const BUFFER_SEGMENTS: usize = 32;

/// Postcodes looked up in the gazetteer as exact `Postcode` entries.
#[derive(Clone)]
pub struct PostcodeGeocoder {
    gazetteer: Arc<dyn Gazetteer>,
    to_output: Arc<dyn TransformPoint>,
    to_metric: Arc<dyn TransformPoint>,
    from_metric: Arc<dyn TransformPoint>,
}

impl PostcodeGeocoder {
    /// Points come back in `config.output_crs`; buffers are drawn in `config.area_crs`.
    pub fn new(
        gazetteer: Arc<dyn Gazetteer>,
        transformers: &TransformerCache,
        config: &GeocoderConfig,
    ) -> std::result::Result<Self, CrsError> {
        let crs = gazetteer.crs();
        Ok(Self {
            to_output: transformers.get(crs, config.output_crs)?,
            to_metric: transformers.get(crs, config.area_crs)?,
            from_metric: transformers.get(config.area_crs, crs)?,
            gazetteer,
        })
    }

    /// The gazetteer entry for `postcode`, in any spacing or case.
    pub fn lookup(&self, postcode: &str) -> Result<Option<GazetteerRecord>> {
        let Some(formatted) = format_postcode(postcode) else {
            debug!(postcode, "Not shaped like a postcode");
            return Ok(None);
        };
        Ok(self.gazetteer.find_exact(&formatted, &LocalType::Postcode)?)
    }

    pub fn locate(&self, postcode: &str) -> Result<Option<Point>> {
        let Some(record) = self.lookup(postcode)? else {
            return Ok(None);
        };
        let point = Point::new(record.x, record.y, self.gazetteer.crs());
        Ok(Some(point.transform(self.to_output.as_ref())?))
    }

    /// The postcode as a feature collection in the gazetteer CRS.
    ///
    /// The first feature is the postcode point. With a positive `buffer` distance a second
    /// feature holds a circle of that radius, measured in the metric area CRS. Zero,
    /// negative or NaN distances draw no buffer.
    #[instrument(name = "Postcode Collection", skip(self), level = "debug")]
    pub fn geocode_collection(
        &self,
        postcode: &str,
        buffer: Option<f64>,
    ) -> Result<Option<FeatureCollection>> {
        let Some(record) = self.lookup(postcode)? else {
            return Ok(None);
        };
        let point = Point::new(record.x, record.y, self.gazetteer.crs());

        let mut collection = FeatureCollection::from_iter([Feature::from_point(&point)
            .with_property("postcode", record.name1.as_str())
            .with_property("type", "postcode")]);

        if let Some(distance) = buffer.filter(|distance| *distance > 0.0) {
            let center = point.transform(self.to_metric.as_ref())?;
            let ring = buffer_ring(&center, distance, BUFFER_SEGMENTS)
                .into_iter()
                .map(|[x, y]| {
                    self.from_metric
                        .transform(x, y)
                        .map(|(x, y)| [x, y])
                })
                .collect::<std::result::Result<Vec<_>, CrsError>>()?;
            collection.push(
                Feature::new(Some(Geometry::polygon(ring)), serde_json::Map::new())
                    .with_property("buffer", distance)
                    .with_property("type", "buffer"),
            );
        }
        Ok(Some(collection))
    }
}

impl PointGeocoder for PostcodeGeocoder {
    fn name(&self) -> &'static str {
        "postcode"
    }

    fn applies_to(&self, payload: &LocationPayload) -> bool {
        payload.postcode().is_some()
    }

    fn geocode(&self, payload: &LocationPayload) -> Result<Option<Point>> {
        payload
            .postcode()
            .map_or(Ok(None), |postcode| self.locate(postcode))
    }
}
