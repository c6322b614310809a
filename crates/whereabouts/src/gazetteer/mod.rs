//! The gazetteer contract: the queries the geocoder issues against a store of named places.
//!
//! The engine never touches storage directly. It asks for an exact `(name, type)` match,
//! a ranked name search, a free-text search inside a box, the nearest place of some types,
//! or a record by id. [`MemoryGazetteer`] is the in-process implementation.

mod memory;
#[cfg(test)]
pub(crate) mod testing;

use std::ops::RangeInclusive;

use geo::Rect;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use whereabouts_data::{GazetteerRecord, LocalType};

pub use error::GazetteerError;
use error::Result;
pub use memory::MemoryGazetteer;

use crate::{crs::CrsCode, geometry::Point};

/// Delimiters placed around the matched span of a free-text headline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightMarkers {
    pub start: String,
    pub stop: String,
}

impl Default for HighlightMarkers {
    fn default() -> Self {
        Self::new("<<<", ">>>")
    }
}

impl HighlightMarkers {
    pub fn new(start: impl Into<String>, stop: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            stop: stop.into(),
        }
    }

    pub fn wrap(&self, span: &str) -> String {
        format!("{}{span}{}", self.start, self.stop)
    }

    /// Whether `headline` actually carries a highlighted span. Empty markers never match.
    pub fn is_highlighted(&self, headline: &str) -> bool {
        if self.start.is_empty() || self.stop.is_empty() {
            return false;
        }
        headline
            .find(&self.start)
            .is_some_and(|at| headline[at + self.start.len()..].contains(&self.stop))
    }
}

/// Ranked name search restricted to a set of place types.
#[derive(Debug, Clone, PartialEq)]
pub struct NameQuery {
    pub text: String,
    /// Types to search. Empty means every type.
    pub local_types: Vec<LocalType>,
    /// Most rows to return. `None` returns every match.
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedRecord {
    pub record: GazetteerRecord,
    pub rank: f64,
}

/// Free-text search for places named in `text` and lying inside `within`.
///
/// `within` is in the gazetteer's CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct TextQuery {
    pub text: String,
    pub within: Rect<f64>,
    pub min_rank: f64,
    pub markers: HighlightMarkers,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextMatch {
    pub record: GazetteerRecord,
    pub rank: f64,
    /// `text` with the matched name wrapped in the query's markers, when it matched.
    pub headline: String,
}

pub trait Gazetteer: Send + Sync {
    /// CRS of every geometry the gazetteer stores and expects.
    fn crs(&self) -> CrsCode;

    fn find_exact(&self, name: &str, local_type: &LocalType) -> Result<Option<GazetteerRecord>>;

    fn search_names(&self, query: &NameQuery) -> Result<Vec<RankedRecord>>;

    /// Places inside the query box whose name occurs in the query text with a rank of at
    /// least `min_rank`. Order is unspecified.
    fn search_text(&self, query: &TextQuery) -> Result<Vec<TextMatch>>;

    /// Closest place to `point` among `local_types` (every type when empty).
    fn nearest(&self, point: &Point, local_types: &[LocalType]) -> Result<Option<GazetteerRecord>>;

    fn record_by_id(&self, id: u64) -> Result<Option<GazetteerRecord>>;

    /// Draw ids uniformly from `ids` until one names a live record.
    ///
    /// Ids can be sparse, so this gives up with `Ok(None)` after `max_attempts` misses.
    #[instrument(name = "Random Record", skip(self, rng), level = "debug")]
    fn random_record(
        &self,
        ids: RangeInclusive<u64>,
        rng: &mut dyn RngCore,
        max_attempts: usize,
    ) -> Result<Option<GazetteerRecord>> {
        if ids.is_empty() {
            return Ok(None);
        }
        for attempt in 1..=max_attempts {
            let id = rng.gen_range(ids.clone());
            if let Some(record) = self.record_by_id(id)? {
                debug!(id, attempt, "Found random record");
                return Ok(Some(record));
            }
        }
        debug!(max_attempts, "No live record found in id range");
        Ok(None)
    }
}

mod error {
    use thiserror::Error;
    use whereabouts_data::DataError;

    use crate::{
        crs::{CrsCode, CrsError},
        index::IndexError,
    };

    #[derive(Error, Debug)]
    pub enum GazetteerError {
        #[error("Index error: {0}")]
        Index(#[from] IndexError),
        #[error("Data error: {0}")]
        Data(#[from] DataError),
        #[error("CRS error: {0}")]
        Crs(#[from] CrsError),
        #[error("Point is in {found} but the gazetteer holds {expected}")]
        CrsMismatch { expected: CrsCode, found: CrsCode },
        #[error(transparent)]
        Other(#[from] anyhow::Error),
    }

    pub type Result<T> = std::result::Result<T, GazetteerError>;
}
