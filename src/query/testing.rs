//! Small engines and canned executors for executor unit tests

use crate::engine::Engine;
use crate::error::Result;
use crate::index::build::{Corpus, CorpusDocument, IndexBuilder};
use crate::index::types::{DocId, EXHAUSTED, IndexConfig, NOT_STARTED};
use crate::query::binding::Binding;
use crate::query::executor::{QueryExecutor, drain_hits, on_document};
use crate::query::node::QueryNode;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One document per entry, tokens split on whitespace, in the `string` feature
pub(crate) fn engine_with(docs: &[&str], config: IndexConfig) -> Engine {
    let corpus = Corpus {
        documents: docs
            .iter()
            .map(|text| CorpusDocument {
                tokens: BTreeMap::from([(
                    "string".to_string(),
                    text.split_whitespace().map(str::to_string).collect(),
                )]),
                annotations: Vec::new(),
            })
            .collect(),
    };
    IndexBuilder::new(config).build(&corpus).unwrap()
}

pub(crate) fn engine(docs: &[&str]) -> Engine {
    engine_with(docs, IndexConfig::default())
}

/// Every `(document, position, length)` the executor produces
pub(crate) fn spans(executor: &mut dyn QueryExecutor) -> Vec<(DocId, u32, u32)> {
    let mut out = Vec::new();
    let mut doc = executor.next_document(-1).unwrap();
    while doc >= 0 {
        for hit in drain_hits(&mut *executor).unwrap() {
            assert_eq!(hit.document(), doc);
            out.push((doc, hit.position(), hit.length()));
        }
        doc = executor.next_document(doc).unwrap();
    }
    out
}

/// Executor over a fixed list of `(document, hits)`, for driving composite
/// executors without an index behind them.
pub(crate) struct StaticExecutor {
    query: Arc<QueryNode>,
    documents: Vec<(DocId, Vec<Binding>)>,
    next: usize,
    hits: std::vec::IntoIter<Binding>,
    latest: DocId,
}

impl StaticExecutor {
    pub(crate) fn new(query: Arc<QueryNode>, mut documents: Vec<(DocId, Vec<Binding>)>) -> Self {
        documents.sort_by_key(|(doc, _)| *doc);
        for (_, hits) in documents.iter_mut() {
            hits.sort();
        }
        Self {
            query,
            documents,
            next: 0,
            hits: Vec::new().into_iter(),
            latest: NOT_STARTED,
        }
    }
}

impl QueryExecutor for StaticExecutor {
    fn next_document(&mut self, greater_than: DocId) -> Result<DocId> {
        if self.latest == EXHAUSTED {
            return Ok(EXHAUSTED);
        }
        let target = greater_than.max(self.latest);
        while self.next < self.documents.len() && self.documents[self.next].0 <= target {
            self.next += 1;
        }
        match self.documents.get_mut(self.next) {
            Some((doc, hits)) => {
                self.latest = *doc;
                self.hits = std::mem::take(hits).into_iter();
                self.next += 1;
            }
            None => {
                self.latest = EXHAUSTED;
                self.hits = Vec::new().into_iter();
            }
        }
        Ok(self.latest)
    }

    fn next_hit(&mut self) -> Result<Option<Binding>> {
        if !on_document(self.latest) {
            return Ok(None);
        }
        Ok(self.hits.next())
    }

    fn latest_document(&self) -> DocId {
        self.latest
    }

    fn close(&mut self) {
        self.documents.clear();
        self.hits = Vec::new().into_iter();
        self.latest = EXHAUSTED;
    }

    fn query(&self) -> &Arc<QueryNode> {
        &self.query
    }
}
