//! Terms read straight from one sub-index
//!
//! Term ids are ranks in string order, so every result built here is sorted
//! by term string and can feed the boolean merges directly.

use crate::engine::Engine;
use crate::error::Result;
use crate::index::positional::PositionalIndex;
use crate::index::reader::PooledReader;
use crate::index::types::{DocId, IndexType, TermId};
use crate::terms::result::TermsResultSet;
use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};

fn enabled() -> bool {
    true
}

/// Terms occurring in one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTermsQuery {
    pub index: String,
    #[serde(default)]
    pub index_type: IndexType,
    pub document: DocId,
    #[serde(default = "enabled")]
    pub strings: bool,
    #[serde(default = "enabled")]
    pub counts: bool,
    /// Cap applied by the query itself, in term order
    #[serde(default)]
    pub limit: Option<usize>,
}

impl DocumentTermsQuery {
    pub fn new(index: &str, index_type: IndexType, document: DocId) -> Self {
        Self {
            index: index.to_string(),
            index_type,
            document,
            strings: true,
            counts: true,
            limit: None,
        }
    }

    pub fn execute(&self, engine: &Engine) -> Result<TermsResultSet> {
        let reader = engine.direct_index(&self.index, self.index_type)?.borrow_reader();
        let terms = reader
            .document_terms(self.document)
            .map(|doc| doc.iter().map(|(id, n)| (id, u64::from(n))).collect())
            .unwrap_or_default();
        Ok(result_set(reader.index(), terms, self.strings, self.counts, self.limit))
    }
}

/// Terms common to every document of a set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentsAndTermsQuery {
    pub index: String,
    #[serde(default)]
    pub index_type: IndexType,
    pub documents: Vec<DocId>,
    #[serde(default = "enabled")]
    pub strings: bool,
    #[serde(default = "enabled")]
    pub counts: bool,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl DocumentsAndTermsQuery {
    pub fn new(index: &str, index_type: IndexType, documents: Vec<DocId>) -> Self {
        Self {
            index: index.to_string(),
            index_type,
            documents,
            strings: true,
            counts: true,
            limit: None,
        }
    }

    pub fn execute(&self, engine: &Engine) -> Result<TermsResultSet> {
        let reader = engine.direct_index(&self.index, self.index_type)?.borrow_reader();
        let documents = distinct(&self.documents);
        let mut common: Option<RoaringBitmap> = None;
        for &doc in &documents {
            let ids = reader
                .document_terms(doc)
                .map(|d| d.term_ids.clone())
                .unwrap_or_default();
            common = Some(match common {
                Some(acc) => acc & ids,
                None => ids,
            });
            if common.as_ref().is_some_and(RoaringBitmap::is_empty) {
                break;
            }
        }
        let terms = summed_counts(&reader, &documents, common.unwrap_or_default());
        Ok(result_set(reader.index(), terms, self.strings, self.counts, self.limit))
    }
}

/// Terms occurring in any document of a set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentsOrTermsQuery {
    pub index: String,
    #[serde(default)]
    pub index_type: IndexType,
    pub documents: Vec<DocId>,
    #[serde(default = "enabled")]
    pub strings: bool,
    #[serde(default = "enabled")]
    pub counts: bool,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl DocumentsOrTermsQuery {
    pub fn new(index: &str, index_type: IndexType, documents: Vec<DocId>) -> Self {
        Self {
            index: index.to_string(),
            index_type,
            documents,
            strings: true,
            counts: true,
            limit: None,
        }
    }

    pub fn execute(&self, engine: &Engine) -> Result<TermsResultSet> {
        let reader = engine.direct_index(&self.index, self.index_type)?.borrow_reader();
        let documents = distinct(&self.documents);
        let mut any = RoaringBitmap::new();
        for &doc in &documents {
            if let Some(terms) = reader.document_terms(doc) {
                any |= &terms.term_ids;
            }
        }
        let terms = summed_counts(&reader, &documents, any);
        Ok(result_set(reader.index(), terms, self.strings, self.counts, self.limit))
    }
}

/// The whole dictionary of a sub-index, optionally restricted to a prefix.
/// Counts are total occurrences in the collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllTermsQuery {
    pub index: String,
    #[serde(default)]
    pub index_type: IndexType,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default = "enabled")]
    pub strings: bool,
    #[serde(default = "enabled")]
    pub counts: bool,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl AllTermsQuery {
    pub fn new(index: &str, index_type: IndexType) -> Self {
        Self {
            index: index.to_string(),
            index_type,
            prefix: None,
            strings: true,
            counts: true,
            limit: None,
        }
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = Some(prefix.to_string());
        self
    }

    pub fn execute(&self, engine: &Engine) -> Result<TermsResultSet> {
        let reader = engine.index(&self.index, self.index_type)?.borrow_reader();
        let index = reader.index();
        let range = match &self.prefix {
            Some(prefix) => index.prefix_range(&index.transform().apply(prefix)),
            None => 0..index.term_count(),
        };
        let end = self
            .limit
            .map_or(range.end, |limit| range.end.min(range.start.saturating_add(limit)));
        let terms = (range.start..end)
            .map(|i| {
                let id = i as TermId;
                let count = if self.counts { index.occurrences(id) } else { 0 };
                (id, count)
            })
            .collect();
        Ok(result_set(index, terms, self.strings, self.counts, None))
    }
}

/// A document listed twice is still one document
fn distinct(documents: &[DocId]) -> Vec<DocId> {
    let mut documents = documents.to_vec();
    documents.sort_unstable();
    documents.dedup();
    documents
}

/// Sum of in-document counts over `documents` for every term in `ids`
fn summed_counts(reader: &PooledReader, documents: &[DocId], ids: RoaringBitmap) -> Vec<(TermId, u64)> {
    ids.iter()
        .map(|id| {
            let count: u64 = documents
                .iter()
                .filter_map(|&doc| reader.document_terms(doc))
                .map(|terms| u64::from(terms.count(id)))
                .sum();
            (id, count)
        })
        .collect()
}

/// Result set from `(term id, count)` pairs in term id order
fn result_set(
    index: &PositionalIndex,
    mut terms: Vec<(TermId, u64)>,
    strings: bool,
    counts: bool,
    limit: Option<usize>,
) -> TermsResultSet {
    if let Some(limit) = limit {
        terms.truncate(limit);
    }
    TermsResultSet {
        term_strings: strings.then(|| {
            terms
                .iter()
                .map(|&(id, _)| index.term(id).unwrap_or_default().to_string())
                .collect()
        }),
        term_counts: counts.then(|| terms.iter().map(|&(_, n)| n).collect()),
        term_lengths: None,
        term_ids: Some(terms.into_iter().map(|(id, _)| id).collect()),
    }
}
