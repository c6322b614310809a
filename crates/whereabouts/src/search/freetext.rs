use serde::Serialize;
use tracing::{debug, instrument, warn};

use super::{Result, SearchError, SpatialSearch};
use crate::{
    feature::{Feature, FeatureCollection},
    gazetteer::TextQuery,
    geometry::{BoundingBox, Point},
};

/// Per-request overrides of the configured free-text thresholds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FreetextOptions {
    pub min_rank: Option<f64>,
    pub max_bbox_area: Option<f64>,
}

impl FreetextOptions {
    pub fn with_min_rank(mut self, min_rank: f64) -> Self {
        self.min_rank = Some(min_rank);
        self
    }

    pub fn with_max_bbox_area(mut self, area: f64) -> Self {
        self.max_bbox_area = Some(area);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FreetextResponse {
    pub text: String,
    /// The searched box in the gazetteer CRS, as EWKT.
    pub bbox: String,
    pub geojson: FeatureCollection,
    /// Box area in square `area_crs` units.
    pub bbox_area: f64,
}

impl SpatialSearch {
    /// Find gazetteer places named in `text` that lie inside `bbox`.
    ///
    /// `bbox` is in the configured input CRS. Boxes larger than the maximum area are
    /// rejected before the gazetteer is queried.
    #[instrument(name = "Freetext Search", skip(self, bbox), level = "debug")]
    pub fn freetext(
        &self,
        text: &str,
        bbox: &BoundingBox,
        options: &FreetextOptions,
    ) -> Result<FreetextResponse> {
        let min_rank = options.min_rank.unwrap_or(self.config.min_rank);
        let max_area = options.max_bbox_area.unwrap_or(self.config.max_bbox_area);

        let search_box = bbox.transform(self.input_to_search.as_ref())?;
        let area = search_box.area_in(self.search_to_area.as_ref())?;
        if area > max_area {
            warn!(area, max_area, "Bounding box too large for free-text search");
            return Err(SearchError::BoundingBoxTooLarge {
                area,
                max_area,
            });
        }

        let markers = &self.config.highlight_markers;
        let mut matches = self.gazetteer.search_text(&TextQuery {
            text: text.to_owned(),
            within: search_box.to_rect(),
            min_rank,
            markers: markers.clone(),
        })?;
        matches.retain(|m| m.rank >= min_rank);
        matches.sort_by(|a, b| b.rank.total_cmp(&a.rank));
        debug!(matches = matches.len(), area, "Free-text search complete");

        let crs = self.gazetteer.crs();
        let geojson = matches
            .into_iter()
            .map(|m| {
                let headline = if markers.is_highlighted(&m.headline) {
                    m.headline
                } else {
                    String::new()
                };
                Feature::from_point(&Point::new(m.record.x, m.record.y, crs))
                    .with_property("name", m.record.name1)
                    .with_property("rank", m.rank)
                    .with_property("headline", headline)
            })
            .collect();

        Ok(FreetextResponse {
            text: text.to_owned(),
            bbox: search_box.to_ewkt(),
            geojson,
            bbox_area: area,
        })
    }
}
