//! Full-text name index over gazetteer records.
//!
//! A Tantivy index held in RAM with the record id stored alongside the tokenized
//! `name1`/`name2` fields and an untokenized `local_type` used as a filter. It answers
//! ranked name queries; everything else about a record lives with the gazetteer.

pub use error::IndexError;
use error::Result;
use tantivy::{
    Index, IndexWriter, Searcher, TantivyDocument, Term,
    collector::{Count, TopDocs},
    query::{BooleanQuery, Occur, Query, QueryParser, TermSetQuery},
    schema::{
        FAST, Field, INDEXED, IndexRecordOption, STORED, Schema, SchemaBuilder, TextFieldIndexing,
        TextOptions, Value,
    },
};
use tracing::{debug, info, instrument, trace, warn};
use whereabouts_data::{GazetteerRecord, LocalType};

const WRITER_MEMORY_BYTES: usize = 50_000_000;

#[derive(Debug, Clone, Copy)]
struct NameFields {
    id: Field,
    name1: Field,
    name2: Field,
    local_type: Field,
}

impl NameFields {
    fn from_schema(schema: &Schema) -> Result<Self> {
        Ok(Self {
            id: schema.get_field("id")?,
            name1: schema.get_field("name1")?,
            name2: schema.get_field("name2")?,
            local_type: schema.get_field("local_type")?,
        })
    }

    /// Fields searched by default and their weights. The primary name dominates.
    fn boosts(self) -> [(Field, f32); 2] {
        [(self.name1, 3.0), (self.name2, 1.0)]
    }
}

fn name_schema() -> Schema {
    let mut schema_builder = SchemaBuilder::new();

    let text_indexing = TextFieldIndexing::default()
        .set_tokenizer("default")
        .set_index_option(IndexRecordOption::WithFreqsAndPositions);
    let text_options = TextOptions::default().set_indexing_options(text_indexing);

    // Feature types are matched whole, "Named Road" must not match "Road".
    let type_options = TextOptions::default().set_indexing_options(
        TextFieldIndexing::default()
            .set_tokenizer("raw")
            .set_index_option(IndexRecordOption::Basic),
    );

    schema_builder.add_u64_field("id", STORED | INDEXED | FAST);
    schema_builder.add_text_field("name1", text_options.clone());
    schema_builder.add_text_field("name2", text_options);
    schema_builder.add_text_field("local_type", type_options);
    schema_builder.build()
}

/// Ranked name search over a fixed record set.
#[derive(Clone)]
pub struct NameIndex {
    index: Index,
    fields: NameFields,
}

impl std::fmt::Debug for NameIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NameIndex")
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

impl NameIndex {
    /// Index every record's names. The index lives in memory for the lifetime of the value.
    #[instrument(name = "Build Name Index", skip_all)]
    pub fn build<'a>(records: impl IntoIterator<Item = &'a GazetteerRecord>) -> Result<Self> {
        let schema = name_schema();
        let fields = NameFields::from_schema(&schema)?;
        let index = Index::create_in_ram(schema);

        let mut writer: IndexWriter = index.writer_with_num_threads(1, WRITER_MEMORY_BYTES)?;
        let mut indexed = 0usize;
        for record in records {
            let mut doc = TantivyDocument::default();
            doc.add_u64(fields.id, record.id);
            doc.add_text(fields.name1, &record.name1);
            if let Some(name2) = &record.name2 {
                doc.add_text(fields.name2, name2);
            }
            doc.add_text(fields.local_type, record.local_type.as_str());
            writer.add_document(doc)?;
            indexed += 1;
        }
        writer.commit()?;

        if indexed == 0 {
            warn!("No records to index. Name index will be empty.");
        } else {
            info!(indexed, "Name index creation complete");
        }
        Ok(Self { index, fields })
    }

    pub fn num_docs(&self) -> Result<u64> {
        Ok(self.index.reader()?.searcher().num_docs())
    }

    #[instrument(name = "Build Name Query", skip_all, level = "trace")]
    fn build_query(&self, query_str: &str, local_types: &[LocalType]) -> Box<dyn Query> {
        let mut parser = QueryParser::for_index(
            &self.index,
            self.fields.boosts().iter().map(|(field, _)| *field).collect(),
        );
        for (field, boost) in self.fields.boosts() {
            parser.set_field_boost(field, boost);
        }
        parser.set_conjunction_by_default();

        let (text_query, errors) = parser.parse_query_lenient(query_str);
        if !errors.is_empty() {
            warn!(?errors, "Query parsing errors occurred");
        }

        if local_types.is_empty() {
            return text_query;
        }
        let type_terms = local_types
            .iter()
            .map(|local_type| Term::from_field_text(self.fields.local_type, local_type.as_str()))
            .collect::<Vec<_>>();
        Box::new(BooleanQuery::new(vec![
            (Occur::Must, text_query),
            (Occur::Must, Box::new(TermSetQuery::new(type_terms))),
        ]))
    }

    /// Ids and relevance scores of records whose names match every word of `query_str`,
    /// best first. An empty `local_types` slice searches every type.
    #[instrument(name = "Search Name Index", skip_all, level = "debug", fields(query = query_str, limit = limit))]
    pub fn search(
        &self,
        query_str: &str,
        local_types: &[LocalType],
        limit: usize,
    ) -> Result<Vec<(u64, f32)>> {
        let query_str = query_str.trim();
        if query_str.is_empty() || limit == 0 {
            debug!("Blank query or zero limit, nothing to search");
            return Ok(Vec::new());
        }

        let query = self.build_query(query_str, local_types);
        trace!(?query, "Final query constructed");

        let searcher = self.index.reader()?.searcher();
        self.top_hits(&searcher, &*query, limit)
    }

    /// Like [`NameIndex::search`] but returns every matching record.
    #[instrument(name = "Search Name Index Fully", skip_all, level = "debug", fields(query = query_str))]
    pub fn search_all(&self, query_str: &str, local_types: &[LocalType]) -> Result<Vec<(u64, f32)>> {
        let query_str = query_str.trim();
        if query_str.is_empty() {
            debug!("Blank query, nothing to search");
            return Ok(Vec::new());
        }

        let query = self.build_query(query_str, local_types);
        let searcher = self.index.reader()?.searcher();
        let total = searcher.search(&*query, &Count)?;
        if total == 0 {
            return Ok(Vec::new());
        }
        self.top_hits(&searcher, &*query, total)
    }

    fn top_hits(&self, searcher: &Searcher, query: &dyn Query, limit: usize) -> Result<Vec<(u64, f32)>> {
        let top_docs = searcher.search(query, &TopDocs::with_limit(limit))?;
        debug!(num_results = top_docs.len(), "Tantivy search execution complete");

        top_docs
            .into_iter()
            .map(|(score, doc_address)| -> Result<(u64, f32)> {
                let doc = searcher.doc::<TantivyDocument>(doc_address)?;
                let id = doc
                    .get_first(self.fields.id)
                    .and_then(|v| v.as_u64())
                    .ok_or_else(|| anyhow::anyhow!("Indexed document without an id: {doc:?}"))?;
                Ok((id, score))
            })
            .collect()
    }
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum IndexError {
        #[error("Tantivy error: {0}")]
        Tantivy(#[from] tantivy::TantivyError),
        #[error(transparent)]
        Other(#[from] anyhow::Error),
    }

    pub type Result<T> = std::result::Result<T, IndexError>;
}
