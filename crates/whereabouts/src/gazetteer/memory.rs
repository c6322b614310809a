use std::path::Path;

use ahash::AHashMap as HashMap;
use geo::{Contains, Rect};
use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use tracing::{debug, info, instrument, trace};
use whereabouts_data::{
    GazetteerRecord, LocalType, OPEN_NAMES_CRS, read_open_names_csv, records_from_frame,
};

use super::{
    Gazetteer, GazetteerError, HighlightMarkers, NameQuery, RankedRecord, Result, TextMatch,
    TextQuery,
};
use crate::{
    crs::{CrsCode, CrsTransformer, TransformPoint},
    geometry::Point,
    index::NameIndex,
};

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("word pattern is valid"));

/// Saturation constant for the phrase rank: one occurrence scores about 0.06,
/// further occurrences approach 1.
const RANK_SATURATION: f64 = 15.5;

/// A lowercased word and its byte span in the source text.
#[derive(Debug)]
struct Word {
    text: String,
    start: usize,
    end: usize,
}

fn words(text: &str) -> Vec<Word> {
    WORD.find_iter(text)
        .map(|m| Word {
            text: m.as_str().to_lowercase(),
            start: m.start(),
            end: m.end(),
        })
        .collect()
}

/// Byte spans in the text where `phrase` occurs as consecutive whole words.
fn phrase_spans(text_words: &[Word], phrase: &[Word]) -> Vec<(usize, usize)> {
    if phrase.is_empty() || phrase.len() > text_words.len() {
        return Vec::new();
    }
    let mut spans = Vec::new();
    let mut at = 0;
    while at + phrase.len() <= text_words.len() {
        let window = &text_words[at..at + phrase.len()];
        if window.iter().zip(phrase).all(|(w, p)| w.text == p.text) {
            spans.push((window[0].start, window[phrase.len() - 1].end));
            at += phrase.len();
        } else {
            at += 1;
        }
    }
    spans
}

fn headline(text: &str, spans: &[(usize, usize)], markers: &HighlightMarkers) -> String {
    let mut out = String::with_capacity(text.len() + spans.len() * 6);
    let mut cursor = 0;
    for &(start, end) in spans {
        out.push_str(&text[cursor..start]);
        out.push_str(&markers.wrap(&text[start..end]));
        cursor = end;
    }
    out.push_str(&text[cursor..]);
    out
}

fn phrase_rank(hits: usize) -> f64 {
    let hits = hits as f64;
    hits / (hits + RANK_SATURATION)
}

/// A gazetteer held entirely in memory.
///
/// Names go into a Tantivy index for ranked search; free-text and nearest-neighbour
/// queries scan the records.
#[derive(Debug)]
pub struct MemoryGazetteer {
    crs: CrsCode,
    records: Vec<GazetteerRecord>,
    by_id: HashMap<u64, usize>,
    exact: HashMap<(String, LocalType), usize>,
    names: NameIndex,
}

impl MemoryGazetteer {
    /// Take ownership of `records`, whose coordinates are in `crs`.
    ///
    /// When several records share a name and type, exact lookup returns the first.
    #[instrument(name = "Build Memory Gazetteer", skip(records), fields(records = records.len()))]
    pub fn new(records: Vec<GazetteerRecord>, crs: CrsCode) -> Result<Self> {
        let mut by_id = HashMap::with_capacity(records.len());
        let mut exact = HashMap::with_capacity(records.len());
        for (position, record) in records.iter().enumerate() {
            by_id.insert(record.id, position);
            exact
                .entry((record.name1.clone(), record.local_type.clone()))
                .or_insert(position);
        }
        let names = NameIndex::build(&records)?;
        info!(records = records.len(), %crs, "Memory gazetteer ready");
        Ok(Self {
            crs,
            records,
            by_id,
            exact,
            names,
        })
    }

    /// Load an Open Names CSV tile, reprojecting its British National Grid geometry
    /// into `crs`.
    #[instrument(name = "Load Open Names", skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_open_names_csv(
        path: impl AsRef<Path>,
        has_header: bool,
        crs: CrsCode,
    ) -> Result<Self> {
        let frame = read_open_names_csv(path, has_header)?;
        let records = records_from_frame(&frame)?;
        let source = CrsCode::new(OPEN_NAMES_CRS)?;
        let transformer = CrsTransformer::new(source, crs)?;

        let records = records
            .into_par_iter()
            .map(|mut record| -> Result<GazetteerRecord> {
                let (x, y) = transformer.transform(record.x, record.y)?;
                record.x = x;
                record.y = y;
                Ok(record)
            })
            .collect::<Result<Vec<_>>>()?;
        debug!(records = records.len(), "Reprojected Open Names records");
        Self::new(records, crs)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[GazetteerRecord] {
        &self.records
    }

    fn check_crs(&self, point: &Point) -> Result<()> {
        if point.crs == self.crs {
            Ok(())
        } else {
            Err(GazetteerError::CrsMismatch {
                expected: self.crs,
                found: point.crs,
            })
        }
    }

    fn within<'a>(&'a self, rect: &'a Rect<f64>) -> impl Iterator<Item = &'a GazetteerRecord> {
        self.records
            .iter()
            .filter(move |record| rect.contains(&geo::Point::new(record.x, record.y)))
    }
}

impl Gazetteer for MemoryGazetteer {
    fn crs(&self) -> CrsCode {
        self.crs
    }

    fn find_exact(&self, name: &str, local_type: &LocalType) -> Result<Option<GazetteerRecord>> {
        let found = self
            .exact
            .get(&(name.to_owned(), local_type.clone()))
            .map(|&position| self.records[position].clone());
        trace!(name, %local_type, found = found.is_some(), "Exact lookup");
        Ok(found)
    }

    fn search_names(&self, query: &NameQuery) -> Result<Vec<RankedRecord>> {
        let hits = match query.limit {
            Some(limit) => self.names.search(&query.text, &query.local_types, limit)?,
            None => self.names.search_all(&query.text, &query.local_types)?,
        };
        Ok(hits
            .into_iter()
            .filter_map(|(id, score)| {
                self.by_id.get(&id).map(|&position| RankedRecord {
                    record: self.records[position].clone(),
                    rank: f64::from(score),
                })
            })
            .collect())
    }

    #[instrument(name = "Memory Text Search", skip_all, level = "debug", fields(text = %query.text))]
    fn search_text(&self, query: &TextQuery) -> Result<Vec<TextMatch>> {
        let text_words = words(&query.text);
        let matches: Vec<TextMatch> = self
            .within(&query.within)
            .filter_map(|record| {
                let spans = phrase_spans(&text_words, &words(&record.name1));
                let rank = phrase_rank(spans.len());
                (rank >= query.min_rank).then(|| TextMatch {
                    record: record.clone(),
                    rank,
                    headline: headline(&query.text, &spans, &query.markers),
                })
            })
            .collect();
        debug!(matches = matches.len(), "Text search complete");
        Ok(matches)
    }

    fn nearest(&self, point: &Point, local_types: &[LocalType]) -> Result<Option<GazetteerRecord>> {
        self.check_crs(point)?;
        Ok(self
            .records
            .iter()
            .filter(|record| local_types.is_empty() || local_types.contains(&record.local_type))
            .map(|record| (point.distance_to(record.x, record.y), record))
            .min_by(|(a, _), (b, _)| a.total_cmp(b))
            .map(|(_, record)| record.clone()))
    }

    fn record_by_id(&self, id: u64) -> Result<Option<GazetteerRecord>> {
        Ok(self
            .by_id
            .get(&id)
            .map(|&position| self.records[position].clone()))
    }
}
