use crate::engine::Engine;
use crate::error::Result;
use crate::index::types::{DocId, EXHAUSTED, NOT_STARTED};
use crate::query::binding::Binding;
use crate::query::executor::{QueryExecutor, on_document};
use crate::query::executors_list::ExecutorsList;
use crate::query::node::QueryNode;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};
use std::sync::Arc;

/// Disjunction over any number of sub-queries.
///
/// Sub-executors live in an [`ExecutorsList`], so only a bounded number are
/// open at a time. A min-heap keyed by each disjunct's current document
/// picks the next document; every disjunct sitting on it has all its hits
/// drained into one buffer sorted by `(position, length)`.
pub struct OrExecutor {
    query: Arc<QueryNode>,
    children: ExecutorsList,
    /// (current document, disjunct) for every disjunct not yet exhausted
    queue: BinaryHeap<Reverse<(DocId, usize)>>,
    hits: VecDeque<Binding>,
    latest: DocId,
    capture: bool,
}

impl OrExecutor {
    /// `query` owns the produced hits; `nodes` are the disjuncts
    pub fn new(query: Arc<QueryNode>, nodes: Vec<Arc<QueryNode>>, engine: &Engine) -> Result<Self> {
        let children = ExecutorsList::new(engine, nodes, engine.executor_cache_size())?;
        let queue = (0..children.len())
            .map(|i| Reverse((NOT_STARTED, i)))
            .collect();
        Ok(Self {
            query,
            children,
            queue,
            hits: VecDeque::new(),
            latest: NOT_STARTED,
            capture: engine.is_sub_bindings_enabled(),
        })
    }

    /// Number of disjuncts
    pub fn width(&self) -> usize {
        self.children.len()
    }

    /// Number of disjunct executors currently open
    pub fn live_executors(&self) -> usize {
        self.children.live()
    }
}

impl QueryExecutor for OrExecutor {
    fn next_document(&mut self, greater_than: DocId) -> Result<DocId> {
        if self.latest == EXHAUSTED {
            return Ok(EXHAUSTED);
        }
        let target = greater_than.max(self.latest);
        self.hits.clear();

        // Only disjuncts at or below the bound need to move
        while let Some(&Reverse((doc, index))) = self.queue.peek() {
            if doc > target {
                break;
            }
            self.queue.pop();
            let next = self.children.next_document(index, target)?;
            if next != EXHAUSTED {
                self.queue.push(Reverse((next, index)));
            }
        }

        self.latest = match self.queue.peek() {
            Some(&Reverse((doc, _))) => doc,
            None => EXHAUSTED,
        };
        if !on_document(self.latest) {
            return Ok(self.latest);
        }

        let mut tied = Vec::new();
        while let Some(&Reverse((doc, index))) = self.queue.peek() {
            if doc != self.latest {
                break;
            }
            self.queue.pop();
            tied.push(index);
        }
        let mut hits = Vec::new();
        for index in tied {
            while let Some(hit) = self.children.next_hit(index)? {
                hits.push(hit);
            }
            self.queue.push(Reverse((self.latest, index)));
        }
        hits.sort_by_key(|h| (h.position(), h.length()));
        self.hits = hits.into();
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
        self.children.close();
        self.queue.clear();
        self.hits.clear();
        self.latest = EXHAUSTED;
    }

    fn query(&self) -> &Arc<QueryNode> {
        &self.query
    }
}
