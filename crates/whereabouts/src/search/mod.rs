//! Searching the gazetteer.
//!
//! Three kinds of search sit on top of the gazetteer contract: ranked name search with a
//! place-type preference order, free-text search inside a bounding box guarded by a
//! maximum area, and nearest-place reverse lookup.

mod freetext;
mod places;
mod reverse;

use std::sync::Arc;

pub use error::SearchError;
use error::Result;
pub use freetext::{FreetextOptions, FreetextResponse};
pub use places::PlaceMatch;

use crate::{
    config::GeocoderConfig,
    crs::{CrsError, TransformPoint, TransformerCache},
    gazetteer::Gazetteer,
};

/// Search operations bound to one gazetteer and configuration.
#[derive(Clone)]
pub struct SpatialSearch {
    gazetteer: Arc<dyn Gazetteer>,
    config: Arc<GeocoderConfig>,
    /// Bounding boxes from `input_crs` into the gazetteer CRS.
    input_to_search: Arc<dyn TransformPoint>,
    /// Gazetteer CRS into the metric CRS areas are measured in.
    search_to_area: Arc<dyn TransformPoint>,
    /// Reverse lookup coordinates from `coordinate_crs` into the gazetteer CRS.
    coordinate_to_search: Arc<dyn TransformPoint>,
}

impl std::fmt::Debug for SpatialSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialSearch")
            .field("search_crs", &self.gazetteer.crs())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SpatialSearch {
    pub fn new(
        gazetteer: Arc<dyn Gazetteer>,
        transformers: &TransformerCache,
        config: Arc<GeocoderConfig>,
    ) -> std::result::Result<Self, CrsError> {
        let search_crs = gazetteer.crs();
        Ok(Self {
            input_to_search: transformers.get(config.input_crs, search_crs)?,
            search_to_area: transformers.get(search_crs, config.area_crs)?,
            coordinate_to_search: transformers.get(config.coordinate_crs, search_crs)?,
            gazetteer,
            config,
        })
    }

    pub fn config(&self) -> &GeocoderConfig {
        &self.config
    }
}

mod error {
    use serde_json::{Value, json};
    use thiserror::Error;

    use crate::{crs::CrsError, gazetteer::GazetteerError};

    #[derive(Error, Debug)]
    pub enum SearchError {
        #[error("Bounding box area {area} exceeds the maximum of {max_area}")]
        BoundingBoxTooLarge { area: f64, max_area: f64 },
        #[error("CRS error: {0}")]
        Crs(#[from] CrsError),
        #[error("Gazetteer error: {0}")]
        Gazetteer(#[from] GazetteerError),
    }

    impl SearchError {
        /// The client-facing payload for a rejected bounding box.
        pub fn error_payload(&self) -> Option<Value> {
            match self {
                Self::BoundingBoxTooLarge { area, .. } => {
                    Some(json!({ "error": "bbox too large", "area": area }))
                }
                _ => None,
            }
        }
    }

    pub type Result<T> = std::result::Result<T, SearchError>;
}

#[cfg(test)]
mod test_support {
    use std::sync::Arc;

    use whereabouts_data::test_data::sample_records;

    use super::SpatialSearch;
    use crate::{
        config::GeocoderConfig, crs::TransformerCache, gazetteer::Gazetteer,
        gazetteer::MemoryGazetteer,
    };

    pub fn sample_search(config: GeocoderConfig) -> SpatialSearch {
        let gazetteer =
            MemoryGazetteer::new(sample_records(), config.search_crs).expect("sample gazetteer");
        search_over(Arc::new(gazetteer), config)
    }

    pub fn search_over(gazetteer: Arc<dyn Gazetteer>, config: GeocoderConfig) -> SpatialSearch {
        SpatialSearch::new(gazetteer, &TransformerCache::new(), Arc::new(config))
            .expect("sample transformers")
    }
}
