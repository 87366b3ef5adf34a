use crate::engine::Engine;
use crate::error::Result;
use crate::index::types::{DocId, EXHAUSTED, NOT_STARTED};
use crate::query::binding::Binding;
use crate::query::executor::{QueryExecutor, drain_hits, on_document};
use crate::query::node::{Gap, QueryNode};
use crate::query::sequence::{chain_binding, walk_chains};
use std::collections::VecDeque;
use std::sync::Arc;

/// `min..=max` directly adjacent repetitions of one sub-query.
///
/// Matches exactly what an OR over the k-fold adjacent sequences of the
/// child would, for every k in range, without compiling the child k times.
pub struct RepeatsExecutor {
    query: Arc<QueryNode>,
    child: Box<dyn QueryExecutor>,
    min: usize,
    max: usize,
    hits: VecDeque<Binding>,
    latest: DocId,
    capture: bool,
}

impl RepeatsExecutor {
    pub fn new(query: Arc<QueryNode>, node: &Arc<QueryNode>, min: u32, max: u32, engine: &Engine) -> Result<Self> {
        Ok(Self {
            query,
            child: node.executor(engine)?,
            min: min as usize,
            max: max as usize,
            hits: VecDeque::new(),
            latest: NOT_STARTED,
            capture: engine.is_sub_bindings_enabled(),
        })
    }

    fn repetitions(&self, document: DocId, hits: &[Binding]) -> Result<Vec<Binding>> {
        // Adjacent hits start strictly later, so no chain is longer than `hits`
        let depth = self.max.min(hits.len());
        if depth < self.min {
            return Ok(Vec::new());
        }
        let columns = vec![hits; depth];
        let gaps = vec![Gap::ADJACENT; depth - 1];
        let mut matched = Vec::new();
        walk_chains(&columns, &gaps, self.min, &mut |chain| {
            matched.push(chain_binding(&self.query, document, chain, self.capture));
        });
        let mut matched = matched.into_iter().collect::<Result<Vec<_>>>()?;
        matched.sort_by_key(|h| (h.position(), h.length()));
        Ok(matched)
    }
}

impl QueryExecutor for RepeatsExecutor {
    fn next_document(&mut self, greater_than: DocId) -> Result<DocId> {
        if self.latest == EXHAUSTED {
            return Ok(EXHAUSTED);
        }
        self.hits.clear();
        let mut target = greater_than.max(self.latest);
        loop {
            let doc = self.child.next_document(target)?;
            if doc == EXHAUSTED {
                self.latest = EXHAUSTED;
                return Ok(EXHAUSTED);
            }
            let mut hits = drain_hits(self.child.as_mut())?;
            hits.sort();
            let matched = self.repetitions(doc, &hits)?;
            if !matched.is_empty() {
                self.latest = doc;
                self.hits = matched.into();
                return Ok(doc);
            }
            target = doc;
        }
    }

    fn next_hit(&mut self) -> Result<Option<Binding>> {
        if !on_document(self.latest) {
            return Ok(None);
        }
        Ok(self.hits.pop_front())
    }

    fn latest_document(&self) -> DocId {
        self.latest
    }

    fn close(&mut self) {
        self.child.close();
        self.hits.clear();
        self.latest = EXHAUSTED;
    }

    fn query(&self) -> &Arc<QueryNode> {
        &self.query
    }
}
