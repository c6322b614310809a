use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use whereabouts_data::LocalType;

use super::{Result, SpatialSearch};
use crate::gazetteer::{NameQuery, RankedRecord};

/// One row of a place-name search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceMatch {
    pub name1: String,
    pub postcode_district: Option<String>,
    pub region: Option<String>,
    pub populated_place: Option<String>,
    pub local_type: LocalType,
    pub rank: f64,
}

impl From<RankedRecord> for PlaceMatch {
    fn from(ranked: RankedRecord) -> Self {
        let record = ranked.record;
        Self {
            name1: record.name1,
            postcode_district: record.postcode_district,
            region: record.region,
            populated_place: record.populated_place,
            local_type: record.local_type,
            rank: ranked.rank,
        }
    }
}

/// Sort key: position in the preference list first, then descending rank.
fn preference_order(matches: &mut [PlaceMatch], preference: &[LocalType]) {
    let position = |local_type: &LocalType| {
        preference
            .iter()
            .position(|preferred| preferred == local_type)
            .unwrap_or(preference.len())
    };
    matches.sort_by(|a, b| {
        position(&a.local_type)
            .cmp(&position(&b.local_type))
            .then_with(|| b.rank.total_cmp(&a.rank))
    });
}

impl SpatialSearch {
    /// Search place names, restricted to `local_types` and ordered by that preference.
    ///
    /// An empty `local_types` falls back to the configured default preference. At most
    /// `name_search_limit` rows are returned, cut after ordering so a preferred type is
    /// never crowded out by better-scoring rows of a less preferred one.
    #[instrument(name = "Places Search", skip(self), level = "debug")]
    pub fn places_search(&self, query: &str, local_types: &[LocalType]) -> Result<Vec<PlaceMatch>> {
        let preference = if local_types.is_empty() {
            self.config.default_local_types.as_slice()
        } else {
            local_types
        };
        let ranked = self.gazetteer.search_names(&NameQuery {
            text: query.to_owned(),
            local_types: preference.to_vec(),
            limit: None,
        })?;

        let mut matches: Vec<PlaceMatch> = ranked.into_iter().map(PlaceMatch::from).collect();
        let found = matches.len();
        preference_order(&mut matches, preference);
        matches.truncate(self.config.name_search_limit);
        debug!(found, matches = matches.len(), "Places search complete");
        Ok(matches)
    }
}
