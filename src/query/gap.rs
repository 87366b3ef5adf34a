use crate::engine::Engine;
use crate::error::{QueryError, Result};
use crate::index::types::DocId;
use crate::query::binding::Binding;
use crate::query::executor::QueryExecutor;
use crate::query::node::QueryNode;
use std::sync::Arc;

/// Extends every hit of its child by a fixed number of trailing tokens
pub struct GapExecutor {
    query: Arc<QueryNode>,
    child: Box<dyn QueryExecutor>,
    gap: u32,
    capture: bool,
}

impl GapExecutor {
    pub fn new(query: Arc<QueryNode>, node: &Arc<QueryNode>, gap: u32, engine: &Engine) -> Result<Self> {
        Ok(Self {
            query,
            child: node.executor(engine)?,
            gap,
            capture: engine.is_sub_bindings_enabled(),
        })
    }
}

impl QueryExecutor for GapExecutor {
    fn next_document(&mut self, greater_than: DocId) -> Result<DocId> {
        self.child.next_document(greater_than)
    }

    fn next_hit(&mut self) -> Result<Option<Binding>> {
        let Some(hit) = self.child.next_hit()? else {
            return Ok(None);
        };
        let (document, position) = (hit.document(), hit.position());
        let length = hit
            .length()
            .checked_add(self.gap)
            .ok_or(QueryError::SpanOverflow { document, position })?;
        Ok(Some(Binding::compound(
            Arc::clone(&self.query),
            document,
            position,
            length,
            vec![hit],
            self.capture,
        )))
    }

    fn latest_document(&self) -> DocId {
        self.child.latest_document()
    }

    fn close(&mut self) {
        self.child.close();
    }

    fn query(&self) -> &Arc<QueryNode> {
        &self.query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::types::EXHAUSTED;
    use crate::query::testing::{engine, spans};

    #[test]
    fn test_hits_gain_trailing_slack() {
        let engine = engine(&["a b a", "b", "x a"]);
        let mut exec = QueryNode::gap(QueryNode::term("string", "a"), 2).executor(&engine).unwrap();
        assert_eq!(spans(exec.as_mut()), vec![(0, 0, 3), (0, 2, 3), (2, 1, 3)]);
    }

    #[test]
    fn test_documents_follow_the_child() {
        let engine = engine(&["a", "b", "a"]);
        let mut exec = QueryNode::gap(QueryNode::term("string", "a"), 0).executor(&engine).unwrap();
        assert_eq!(exec.next_document(0).unwrap(), 2);
        assert_eq!(exec.latest_document(), 2);
        assert_eq!(exec.next_hit().unwrap().unwrap().length(), 1);
        assert_eq!(exec.next_document(-1).unwrap(), EXHAUSTED);
    }

    #[test]
    fn test_slack_up_to_the_position_range() {
        let engine = engine(&["a b"]);
        let mut exec = QueryNode::gap(QueryNode::term("string", "b"), u32::MAX - 1)
            .executor(&engine)
            .unwrap();
        assert_eq!(spans(exec.as_mut()), vec![(0, 1, u32::MAX)]);
    }

    #[test]
    fn test_slack_past_the_position_range_is_an_error() {
        let engine = engine(&["a b"]);
        let mut exec = QueryNode::gap(QueryNode::term("string", "b"), u32::MAX)
            .executor(&engine)
            .unwrap();
        assert_eq!(exec.next_document(-1).unwrap(), 0);
        assert!(matches!(
            exec.next_hit(),
            Err(QueryError::SpanOverflow { document: 0, position: 1 })
        ));
        exec.close();
        assert_eq!(engine.token_index("string").unwrap().borrowed(), 0);
    }

    #[test]
    fn test_nested_hit_is_captured() {
        let engine = engine(&["a"]);
        engine.set_sub_bindings_enabled(true);
        let term = QueryNode::term("string", "a");
        let query = QueryNode::gap(Arc::clone(&term), 4);
        let mut exec = query.executor(&engine).unwrap();
        exec.next_document(-1).unwrap();
        let hit = exec.next_hit().unwrap().unwrap();
        assert!(Arc::ptr_eq(hit.query(), &query));
        let nested = hit.contained().unwrap();
        assert_eq!(nested.len(), 1);
        assert!(Arc::ptr_eq(nested[0].query(), &term));
        assert_eq!((nested[0].position(), nested[0].length()), (0, 1));
    }
}
