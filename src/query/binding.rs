use crate::index::types::{DocId, Position};
use crate::query::node::QueryNode;
use std::cmp::Ordering;
use std::sync::Arc;

/// One match of a query node against a span of a document.
///
/// Bindings compare and order by `(document, position, length)` only; the
/// owning node and nested bindings do not take part.
///
/// Only the outermost binding of a compound match carries nested bindings,
/// as one flat array of every descendant. The descendants themselves have
/// none. [`Binding::compound`] is the single place that builds this shape.
#[derive(Debug, Clone)]
pub struct Binding {
    document: DocId,
    position: Position,
    length: u32,
    query: Arc<QueryNode>,
    contained: Option<Box<[Binding]>>,
}

impl Binding {
    /// A leaf binding with no nested matches
    pub fn new(query: Arc<QueryNode>, document: DocId, position: Position, length: u32) -> Self {
        debug_assert!(length >= 1, "binding length must be at least 1");
        Self {
            document,
            position,
            length,
            query,
            contained: None,
        }
    }

    /// The outermost binding of a compound match.
    ///
    /// With `capture` set, `parts` and all of their own nested bindings are
    /// flattened into this binding (pre-order) and stripped from the parts.
    /// Without it, `parts` is discarded.
    pub fn compound(
        query: Arc<QueryNode>,
        document: DocId,
        position: Position,
        length: u32,
        parts: Vec<Binding>,
        capture: bool,
    ) -> Self {
        let mut binding = Self::new(query, document, position, length);
        if capture && !parts.is_empty() {
            binding.contained = Some(flatten(parts));
        }
        binding
    }

    /// The same span owned by `query`, with this binding nested one level down
    pub fn rewrap(self, query: &Arc<QueryNode>, capture: bool) -> Self {
        let (document, position, length) = (self.document, self.position, self.length);
        Self::compound(Arc::clone(query), document, position, length, vec![self], capture)
    }

    pub fn document(&self) -> DocId {
        self.document
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn length(&self) -> u32 {
        self.length
    }

    /// First position after the span. Wider than [`Position`] so that a
    /// span reaching the end of the position range still has an end.
    pub fn end(&self) -> u64 {
        u64::from(self.position) + u64::from(self.length)
    }

    /// Node that produced this binding
    pub fn query(&self) -> &Arc<QueryNode> {
        &self.query
    }

    /// Flattened descendants, present only on outermost bindings with capture on
    pub fn contained(&self) -> Option<&[Binding]> {
        self.contained.as_deref()
    }
}

fn flatten(parts: Vec<Binding>) -> Box<[Binding]> {
    let mut flat = Vec::with_capacity(parts.len());
    for mut part in parts {
        let nested = part.contained.take();
        flat.push(part);
        if let Some(nested) = nested {
            flat.extend(nested.into_vec());
        }
    }
    flat.into_boxed_slice()
}

impl PartialEq for Binding {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Binding {}

impl PartialOrd for Binding {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Binding {
    fn cmp(&self, other: &Self) -> Ordering {
        self.document
            .cmp(&other.document)
            .then(self.position.cmp(&other.position))
            .then(self.length.cmp(&other.length))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(term: &str, position: Position) -> Binding {
        Binding::new(QueryNode::term("string", term), 1, position, 1)
    }

    #[test]
    fn test_ordering_ignores_query() {
        let a = leaf("a", 3);
        let b = leaf("b", 3);
        assert_eq!(a, b);
        assert!(leaf("a", 2) < a);
        let longer = Binding::new(QueryNode::term("string", "a"), 1, 3, 2);
        assert!(a < longer);
    }

    #[test]
    fn test_compound_flattens_descendants() {
        let seq = QueryNode::sequence([QueryNode::term("string", "a"), QueryNode::term("string", "b")]);
        let inner = Binding::compound(Arc::clone(&seq), 1, 3, 2, vec![leaf("a", 3), leaf("b", 4)], true);
        let outer = inner.rewrap(&QueryNode::or([Arc::clone(&seq)]), true);

        let contained = outer.contained().unwrap();
        assert_eq!(contained.len(), 3);
        assert!(Arc::ptr_eq(contained[0].query(), &seq));
        assert!(contained.iter().all(|b| b.contained().is_none()));
        assert_eq!(contained[1].position(), 3);
        assert_eq!(contained[2].position(), 4);
    }

    #[test]
    fn test_compound_without_capture_drops_parts() {
        let b = Binding::compound(QueryNode::term("string", "x"), 1, 0, 2, vec![leaf("a", 0)], false);
        assert!(b.contained().is_none());
        assert_eq!(b.end(), 2);
    }

    #[test]
    fn test_end_of_widest_span() {
        let b = Binding::new(QueryNode::term("string", "x"), 0, 7, u32::MAX);
        assert_eq!(b.end(), 7 + u64::from(u32::MAX));
        let last = Binding::new(QueryNode::term("string", "x"), 0, u32::MAX, u32::MAX);
        assert!(b < last);
        assert_eq!(last.end(), 2 * u64::from(u32::MAX));
    }
}
