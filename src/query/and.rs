use crate::engine::Engine;
use crate::error::Result;
use crate::index::types::{DocId, EXHAUSTED, NOT_STARTED};
use crate::query::binding::Binding;
use crate::query::executor::{QueryExecutor, converge, drain_hits, on_document};
use crate::query::node::QueryNode;
use std::collections::VecDeque;
use std::sync::Arc;

/// Document-level intersection.
///
/// Documents are found by converging all children on a common id. The hits
/// of a matched document are the union of every child's hits there, in
/// `(position, length)` order.
pub struct AndExecutor {
    query: Arc<QueryNode>,
    children: Vec<Box<dyn QueryExecutor>>,
    hits: VecDeque<Binding>,
    latest: DocId,
    capture: bool,
}

impl AndExecutor {
    pub fn new(query: Arc<QueryNode>, nodes: &[Arc<QueryNode>], engine: &Engine) -> Result<Self> {
        let children = nodes
            .iter()
            .map(|node| node.executor(engine))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            query,
            children,
            hits: VecDeque::new(),
            latest: NOT_STARTED,
            capture: engine.is_sub_bindings_enabled(),
        })
    }
}

impl QueryExecutor for AndExecutor {
    fn next_document(&mut self, greater_than: DocId) -> Result<DocId> {
        if self.latest == EXHAUSTED {
            return Ok(EXHAUSTED);
        }
        self.hits.clear();
        self.latest = converge(&mut self.children, greater_than.max(self.latest))?;
        if on_document(self.latest) {
            let mut hits = Vec::new();
            for child in self.children.iter_mut() {
                hits.extend(drain_hits(child.as_mut())?);
            }
            hits.sort_by_key(|h| (h.position(), h.length()));
            self.hits = hits.into();
        }
        Ok(self.latest)
    }

    fn next_hit(&mut self) -> Result<Option<Binding>> {
        if !on_document(self.latest) {
            return Ok(None);
        }
        Ok(self
            .hits
            .pop_front()
            .map(|hit| hit.rewrap(&self.query, self.capture)))
    }

    fn latest_document(&self) -> DocId {
        self.latest
    }

    fn close(&mut self) {
        for child in self.children.iter_mut() {
            child.close();
        }
        self.hits.clear();
        self.latest = EXHAUSTED;
    }

    fn query(&self) -> &Arc<QueryNode> {
        &self.query
    }
}
