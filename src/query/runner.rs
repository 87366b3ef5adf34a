use crate::engine::Engine;
use crate::error::Result;
use crate::index::types::{DocId, EXHAUSTED, Position};
use crate::query::binding::Binding;
use crate::query::executor::drain_hits;
use crate::query::node::QueryNode;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Every hit of one matched document
#[derive(Debug, Clone)]
pub struct DocumentHits {
    pub document: DocId,
    pub hits: Vec<Binding>,
}

/// Serializable view of [`DocumentHits`]
#[derive(Debug, Clone, Serialize)]
pub struct DocumentHitsView {
    pub document: DocId,
    pub hits: Vec<HitView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HitView {
    pub position: Position,
    pub length: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub contained: Vec<HitView>,
}

impl From<&Binding> for HitView {
    fn from(binding: &Binding) -> Self {
        Self {
            position: binding.position(),
            length: binding.length(),
            contained: binding
                .contained()
                .unwrap_or_default()
                .iter()
                .map(HitView::from)
                .collect(),
        }
    }
}

impl DocumentHits {
    pub fn view(&self) -> DocumentHitsView {
        DocumentHitsView {
            document: self.document,
            hits: self.hits.iter().map(HitView::from).collect(),
        }
    }
}

/// Drives a root executor to completion
pub struct QueryRunner {
    engine: Engine,
    limit: Option<usize>,
}

impl QueryRunner {
    pub fn new(engine: &Engine) -> Self {
        Self {
            engine: engine.clone(),
            limit: None,
        }
    }

    /// Stop after this many matched documents
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Compile `query` and collect the hits of every matched document, in
    /// document order. The executor is closed on every path.
    pub fn run(&self, query: &Arc<QueryNode>) -> Result<Vec<DocumentHits>> {
        let mut executor = query.executor(&self.engine)?;
        let limit = self.limit.unwrap_or(usize::MAX);
        let mut results = Vec::new();

        let outcome = (|| -> Result<()> {
            let mut doc = executor.next_document(-1)?;
            while doc != EXHAUSTED && results.len() < limit {
                let hits = drain_hits(executor.as_mut())?;
                results.push(DocumentHits { document: doc, hits });
                doc = executor.next_document(doc)?;
            }
            Ok(())
        })();
        executor.close();
        outcome?;

        debug!(documents = results.len(), "query finished");
        Ok(results)
    }

    /// Matched document ids only
    pub fn documents(&self, query: &Arc<QueryNode>) -> Result<Vec<DocId>> {
        let mut executor = query.executor(&self.engine)?;
        let limit = self.limit.unwrap_or(usize::MAX);
        let mut documents = Vec::new();

        let outcome = (|| -> Result<()> {
            let mut doc = executor.next_document(-1)?;
            while doc != EXHAUSTED && documents.len() < limit {
                documents.push(doc);
                doc = executor.next_document(doc)?;
            }
            Ok(())
        })();
        executor.close();
        outcome?;
        Ok(documents)
    }
}
