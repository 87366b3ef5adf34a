use crate::engine::Engine;
use crate::error::{QueryError, Result};
use crate::index::types::{DocId, EXHAUSTED, NOT_STARTED};
use crate::query::binding::Binding;
use crate::query::executor::{QueryExecutor, converge, drain_hits, on_document};
use crate::query::node::{Gap, QueryNode};
use std::collections::VecDeque;
use std::sync::Arc;

/// Ordered concatenation of sub-queries.
///
/// On a document matched by every element, each chain `h0, h1, .., hn`
/// with `h(k+1)` starting within `gaps[k]` tokens of the end of `hk` is one
/// hit spanning `h0.start .. hn.end`.
pub struct SequenceExecutor {
    query: Arc<QueryNode>,
    children: Vec<Box<dyn QueryExecutor>>,
    gaps: Vec<Gap>,
    hits: VecDeque<Binding>,
    latest: DocId,
    capture: bool,
}

impl SequenceExecutor {
    pub fn new(
        query: Arc<QueryNode>,
        nodes: &[Arc<QueryNode>],
        gaps: Vec<Gap>,
        engine: &Engine,
    ) -> Result<Self> {
        let children = nodes
            .iter()
            .map(|node| node.executor(engine))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            query,
            children,
            gaps,
            hits: VecDeque::new(),
            latest: NOT_STARTED,
            capture: engine.is_sub_bindings_enabled(),
        })
    }
}

impl QueryExecutor for SequenceExecutor {
    fn next_document(&mut self, greater_than: DocId) -> Result<DocId> {
        if self.latest == EXHAUSTED {
            return Ok(EXHAUSTED);
        }
        self.hits.clear();
        let mut target = greater_than.max(self.latest);
        loop {
            let doc = converge(&mut self.children, target)?;
            if doc == EXHAUSTED {
                self.latest = EXHAUSTED;
                return Ok(EXHAUSTED);
            }
            let mut columns = Vec::with_capacity(self.children.len());
            for child in self.children.iter_mut() {
                let mut hits = drain_hits(child.as_mut())?;
                hits.sort();
                columns.push(hits);
            }
            let columns: Vec<&[Binding]> = columns.iter().map(Vec::as_slice).collect();

            let mut matched = Vec::new();
            walk_chains(&columns, &self.gaps, columns.len(), &mut |chain| {
                matched.push(chain_binding(&self.query, doc, chain, self.capture));
            });
            let mut matched = matched.into_iter().collect::<Result<Vec<_>>>()?;
            if !matched.is_empty() {
                matched.sort_by_key(|h| (h.position(), h.length()));
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

/// Depth-first walk over chains taking one hit per column.
///
/// Each column must be sorted by position. The hit in column `k + 1` must
/// start between `gaps[k].min` and `gaps[k].max` tokens after the end of
/// the hit in column `k`. `emit` sees every chain of at least `min_len`
/// hits, so prefixes are reported too when `min_len < columns.len()`.
pub(crate) fn walk_chains<'a>(
    columns: &[&'a [Binding]],
    gaps: &[Gap],
    min_len: usize,
    emit: &mut dyn FnMut(&[&'a Binding]),
) {
    let Some(first) = columns.first() else {
        return;
    };
    let mut chain = Vec::with_capacity(columns.len());
    for hit in first.iter() {
        chain.push(hit);
        extend(columns, gaps, min_len, &mut chain, emit);
        chain.pop();
    }
}

fn extend<'a>(
    columns: &[&'a [Binding]],
    gaps: &[Gap],
    min_len: usize,
    chain: &mut Vec<&'a Binding>,
    emit: &mut dyn FnMut(&[&'a Binding]),
) {
    let depth = chain.len();
    if depth >= min_len {
        emit(chain);
    }
    if depth == columns.len() {
        return;
    }
    let end = chain[depth - 1].end();
    let gap = gaps[depth - 1];
    let (lo, hi) = (end + u64::from(gap.min), end + u64::from(gap.max));
    let column = columns[depth];
    let from = column.partition_point(|h| u64::from(h.position()) < lo);
    let to = column.partition_point(|h| u64::from(h.position()) <= hi);
    for hit in &column[from..to] {
        chain.push(hit);
        extend(columns, gaps, min_len, chain, emit);
        chain.pop();
    }
}

/// Hit spanning a whole chain, owned by `query`
pub(crate) fn chain_binding(
    query: &Arc<QueryNode>,
    document: DocId,
    chain: &[&Binding],
    capture: bool,
) -> Result<Binding> {
    let start = chain[0].position();
    let end = chain[chain.len() - 1].end();
    let length = u32::try_from(end - u64::from(start)).map_err(|_| QueryError::SpanOverflow {
        document,
        position: start,
    })?;
    let parts = if capture {
        chain.iter().map(|&hit| hit.clone()).collect()
    } else {
        Vec::new()
    };
    Ok(Binding::compound(Arc::clone(query), document, start, length, parts, capture))
}
