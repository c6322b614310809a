use std::sync::atomic::{AtomicUsize, Ordering};

use whereabouts_data::{GazetteerRecord, LocalType};

use super::{Gazetteer, GazetteerError, NameQuery, RankedRecord, Result, TextMatch, TextQuery};
use crate::{crs::CrsCode, geometry::Point};

/// Counts every query and answers with nothing, or with an error when `failing`.
#[derive(Debug, Default)]
pub struct SpyGazetteer {
    pub calls: AtomicUsize,
    pub failing: bool,
}

impl SpyGazetteer {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn answer<T: Default>(&self) -> Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            Err(GazetteerError::Other(anyhow::anyhow!("connection reset")))
        } else {
            Ok(T::default())
        }
    }
}

impl Gazetteer for SpyGazetteer {
    fn crs(&self) -> CrsCode {
        CrsCode::WGS84
    }

    fn find_exact(&self, _: &str, _: &LocalType) -> Result<Option<GazetteerRecord>> {
        self.answer()
    }

    fn search_names(&self, _: &NameQuery) -> Result<Vec<RankedRecord>> {
        self.answer()
    }

    fn search_text(&self, _: &TextQuery) -> Result<Vec<TextMatch>> {
        self.answer()
    }

    fn nearest(&self, _: &Point, _: &[LocalType]) -> Result<Option<GazetteerRecord>> {
        self.answer()
    }

    fn record_by_id(&self, _: u64) -> Result<Option<GazetteerRecord>> {
        self.answer()
    }
}
