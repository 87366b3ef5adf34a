use crate::engine::Engine;
use crate::error::Result;
use crate::index::types::{DocId, EXHAUSTED, NOT_STARTED};
use crate::query::binding::Binding;
use crate::query::executor::{QueryExecutor, converge, drain_hits, on_document};
use crate::query::node::QueryNode;
use std::collections::VecDeque;
use std::sync::Arc;

const INNER: usize = 0;
const OUTER: usize = 1;

/// Which side of a containment pair is surfaced as hits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapTarget {
    /// Inner hits lying inside some outer hit (`Within`)
    Inner,
    /// Outer hits with some inner hit inside them (`Contains`)
    Outer,
}

/// Containment filter between an inner and an outer query.
///
/// Both sides are converged on a common document, then all hits of both are
/// materialised and paired. A document with no contained pair is skipped.
pub struct OverlapExecutor {
    query: Arc<QueryNode>,
    target: OverlapTarget,
    /// `[inner, outer]`
    streams: Vec<Box<dyn QueryExecutor>>,
    hits: VecDeque<Binding>,
    latest: DocId,
    capture: bool,
}

impl OverlapExecutor {
    pub fn new(
        query: Arc<QueryNode>,
        target: OverlapTarget,
        inner: &Arc<QueryNode>,
        outer: &Arc<QueryNode>,
        engine: &Engine,
    ) -> Result<Self> {
        Ok(Self {
            query,
            target,
            streams: vec![inner.executor(engine)?, outer.executor(engine)?],
            hits: VecDeque::new(),
            latest: NOT_STARTED,
            capture: engine.is_sub_bindings_enabled(),
        })
    }

    fn pair(&self, document: DocId, inner: &[Binding], outer: &[Binding]) -> Vec<Binding> {
        match self.target {
            OverlapTarget::Inner => within(inner, outer)
                .map(|(i, o)| self.surface(document, i, o))
                .collect(),
            OverlapTarget::Outer => contains(outer, inner)
                .map(|(o, i)| self.surface(document, o, i))
                .collect(),
        }
    }

    /// Surfaced hit first, witness second
    fn surface(&self, document: DocId, hit: &Binding, witness: &Binding) -> Binding {
        let parts = if self.capture {
            vec![hit.clone(), witness.clone()]
        } else {
            Vec::new()
        };
        Binding::compound(
            Arc::clone(&self.query),
            document,
            hit.position(),
            hit.length(),
            parts,
            self.capture,
        )
    }
}

/// Every inner hit paired with the widest outer hit starting at or before it,
/// kept when that outer hit covers it. Both slices sorted by position.
fn within<'a>(
    inner: &'a [Binding],
    outer: &'a [Binding],
) -> impl Iterator<Item = (&'a Binding, &'a Binding)> + 'a {
    let mut next_outer = 0;
    let mut widest: Option<&'a Binding> = None;
    inner.iter().filter_map(move |hit| {
        while next_outer < outer.len() && outer[next_outer].position() <= hit.position() {
            let candidate = &outer[next_outer];
            if widest.is_none_or(|w| candidate.end() > w.end()) {
                widest = Some(candidate);
            }
            next_outer += 1;
        }
        widest.filter(|w| w.end() >= hit.end()).map(|w| (hit, w))
    })
}

/// Every outer hit paired with the first inner hit it covers. Inner hits
/// starting before the current outer hit are retired for good, since later
/// outer hits start no earlier.
fn contains<'a>(
    outer: &'a [Binding],
    inner: &'a [Binding],
) -> impl Iterator<Item = (&'a Binding, &'a Binding)> + 'a {
    let mut first_live = 0;
    outer.iter().filter_map(move |hit| {
        while first_live < inner.len() && inner[first_live].position() < hit.position() {
            first_live += 1;
        }
        inner[first_live..]
            .iter()
            .take_while(|i| u64::from(i.position()) < hit.end())
            .find(|i| i.end() <= hit.end())
            .map(|i| (hit, i))
    })
}

impl QueryExecutor for OverlapExecutor {
    fn next_document(&mut self, greater_than: DocId) -> Result<DocId> {
        if self.latest == EXHAUSTED {
            return Ok(EXHAUSTED);
        }
        self.hits.clear();
        let mut target = greater_than.max(self.latest);
        loop {
            let doc = converge(&mut self.streams, target)?;
            if doc == EXHAUSTED {
                self.latest = EXHAUSTED;
                return Ok(EXHAUSTED);
            }
            let mut inner = drain_hits(self.streams[INNER].as_mut())?;
            let mut outer = drain_hits(self.streams[OUTER].as_mut())?;
            inner.sort();
            outer.sort();
            let matched = self.pair(doc, &inner, &outer);
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
        for stream in self.streams.iter_mut() {
            stream.close();
        }
        self.hits.clear();
        self.latest = EXHAUSTED;
    }

    fn query(&self) -> &Arc<QueryNode> {
        &self.query
    }
}
