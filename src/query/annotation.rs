use crate::engine::Engine;
use crate::error::{QueryError, Result};
use crate::query::node::QueryNode;
use crate::query::or::OrExecutor;
use std::sync::Arc;
use tracing::debug;

/// Compile an annotation node into a disjunction over its mentions.
///
/// The helper resolves the constraints to the matching mention URIs; each
/// becomes a term query against the annotation sub-index, with the
/// mention's own length. Hits are owned by the annotation node.
pub fn annotation_executor(query: &Arc<QueryNode>, engine: &Engine) -> Result<OrExecutor> {
    let QueryNode::Annotation {
        annotation_type,
        constraints,
    } = query.as_ref()
    else {
        return Err(QueryError::InvalidQuery(
            "annotation executor compiled from a non-annotation node".to_string(),
        ));
    };

    let helper = engine.annotation_helper(annotation_type)?;
    let mentions = helper.mentions(annotation_type, constraints, engine)?;
    debug!(
        annotation_type = %annotation_type,
        constraints = constraints.len(),
        mentions = mentions.len(),
        "compiled annotation query"
    );

    let nodes = mentions
        .iter()
        .map(|mention| QueryNode::mention(annotation_type, &mention.uri, mention.length))
        .collect();
    OrExecutor::new(Arc::clone(query), nodes, engine)
}
