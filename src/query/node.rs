//! Query node algebra
//!
//! A query is an immutable tree of [`QueryNode`] values. Nodes hold only
//! what is needed to compile an executor and can be compiled any number of
//! times, each compilation yielding an independent executor tree.

use crate::annotation::Constraint;
use crate::engine::Engine;
use crate::error::{QueryError, Result};
use crate::index::types::IndexType;
use crate::query::and::AndExecutor;
use crate::query::annotation::annotation_executor;
use crate::query::executor::QueryExecutor;
use crate::query::gap::GapExecutor;
use crate::query::or::OrExecutor;
use crate::query::overlap::{OverlapExecutor, OverlapTarget};
use crate::query::repeats::RepeatsExecutor;
use crate::query::sequence::SequenceExecutor;
use crate::query::term::TermExecutor;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Number of untracked tokens allowed between two sequence elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gap {
    pub min: u32,
    pub max: u32,
}

impl Gap {
    /// Elements must be directly adjacent
    pub const ADJACENT: Gap = Gap { min: 0, max: 0 };

    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }
}

/// Query AST node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryNode {
    /// A single term in one sub-index
    Term {
        index: String,
        term: String,
        #[serde(default)]
        index_type: IndexType,
        /// Hit length; token terms default to 1, annotation mentions must supply it
        #[serde(default)]
        length: Option<u32>,
    },
    /// Any of the sub-queries
    Or { nodes: Vec<Arc<QueryNode>> },
    /// Documents matched by all sub-queries
    And { nodes: Vec<Arc<QueryNode>> },
    /// Hits of `inner` lying inside a hit of `outer`
    Within {
        inner: Arc<QueryNode>,
        outer: Arc<QueryNode>,
    },
    /// Hits of `outer` with a hit of `inner` inside them
    Contains {
        outer: Arc<QueryNode>,
        inner: Arc<QueryNode>,
    },
    /// Hits of `node` extended by `gap` tokens of slack at the end
    Gap { node: Arc<QueryNode>, gap: u32 },
    /// Sub-queries matched end to end, with optional gaps between neighbours
    Sequence {
        nodes: Vec<Arc<QueryNode>>,
        #[serde(default)]
        gaps: Option<Vec<Gap>>,
    },
    /// Between `min` and `max` adjacent repetitions of `node`
    Repeats {
        node: Arc<QueryNode>,
        min: u32,
        max: u32,
    },
    /// Mentions of a semantic annotation type matching feature constraints
    Annotation {
        annotation_type: String,
        #[serde(default)]
        constraints: Vec<Constraint>,
    },
}

impl QueryNode {
    pub fn term(index: &str, term: &str) -> Arc<Self> {
        Arc::new(QueryNode::Term {
            index: index.to_string(),
            term: term.to_string(),
            index_type: IndexType::Tokens,
            length: None,
        })
    }

    /// A mention URI in an annotation sub-index
    pub fn mention(annotation_type: &str, uri: &str, length: u32) -> Arc<Self> {
        Arc::new(QueryNode::Term {
            index: annotation_type.to_string(),
            term: uri.to_string(),
            index_type: IndexType::Annotations,
            length: Some(length),
        })
    }

    pub fn or(nodes: impl IntoIterator<Item = Arc<QueryNode>>) -> Arc<Self> {
        Arc::new(QueryNode::Or {
            nodes: nodes.into_iter().collect(),
        })
    }

    pub fn and(nodes: impl IntoIterator<Item = Arc<QueryNode>>) -> Arc<Self> {
        Arc::new(QueryNode::And {
            nodes: nodes.into_iter().collect(),
        })
    }

    pub fn within(inner: Arc<QueryNode>, outer: Arc<QueryNode>) -> Arc<Self> {
        Arc::new(QueryNode::Within { inner, outer })
    }

    pub fn contains(outer: Arc<QueryNode>, inner: Arc<QueryNode>) -> Arc<Self> {
        Arc::new(QueryNode::Contains { outer, inner })
    }

    pub fn gap(node: Arc<QueryNode>, gap: u32) -> Arc<Self> {
        Arc::new(QueryNode::Gap { node, gap })
    }

    pub fn sequence(nodes: impl IntoIterator<Item = Arc<QueryNode>>) -> Arc<Self> {
        Arc::new(QueryNode::Sequence {
            nodes: nodes.into_iter().collect(),
            gaps: None,
        })
    }

    pub fn sequence_with_gaps(
        nodes: impl IntoIterator<Item = Arc<QueryNode>>,
        gaps: Vec<Gap>,
    ) -> Arc<Self> {
        Arc::new(QueryNode::Sequence {
            nodes: nodes.into_iter().collect(),
            gaps: Some(gaps),
        })
    }

    pub fn repeats(node: Arc<QueryNode>, min: u32, max: u32) -> Arc<Self> {
        Arc::new(QueryNode::Repeats { node, min, max })
    }

    pub fn annotation(annotation_type: &str, constraints: Vec<Constraint>) -> Arc<Self> {
        Arc::new(QueryNode::Annotation {
            annotation_type: annotation_type.to_string(),
            constraints,
        })
    }

    /// Direct sub-queries
    pub fn children(&self) -> Vec<&Arc<QueryNode>> {
        match self {
            QueryNode::Term { .. } | QueryNode::Annotation { .. } => Vec::new(),
            QueryNode::Or { nodes } | QueryNode::And { nodes } | QueryNode::Sequence { nodes, .. } => {
                nodes.iter().collect()
            }
            QueryNode::Within { inner, outer } | QueryNode::Contains { outer, inner } => {
                vec![inner, outer]
            }
            QueryNode::Gap { node, .. } | QueryNode::Repeats { node, .. } => vec![node],
        }
    }

    /// Check the whole tree against the engine without building executors
    pub fn validate(&self, engine: &Engine) -> Result<()> {
        self.check(engine)?;
        for child in self.children() {
            child.validate(engine)?;
        }
        Ok(())
    }

    /// Compile this node (and, recursively, its children) into an executor
    pub fn executor(self: &Arc<Self>, engine: &Engine) -> Result<Box<dyn QueryExecutor>> {
        self.check(engine)?;
        let query = Arc::clone(self);
        let executor: Box<dyn QueryExecutor> = match self.as_ref() {
            QueryNode::Term { .. } => Box::new(TermExecutor::new(query, engine)?),
            QueryNode::Or { nodes } => Box::new(OrExecutor::new(query, nodes.clone(), engine)?),
            QueryNode::And { nodes } => Box::new(AndExecutor::new(query, nodes, engine)?),
            QueryNode::Within { inner, outer } => Box::new(OverlapExecutor::new(
                query,
                OverlapTarget::Inner,
                inner,
                outer,
                engine,
            )?),
            QueryNode::Contains { outer, inner } => Box::new(OverlapExecutor::new(
                query,
                OverlapTarget::Outer,
                inner,
                outer,
                engine,
            )?),
            QueryNode::Gap { node, gap } => Box::new(GapExecutor::new(query, node, *gap, engine)?),
            QueryNode::Sequence { nodes, gaps } => {
                let gaps = sequence_gaps(nodes.len(), gaps.as_deref())?;
                Box::new(SequenceExecutor::new(query, nodes, gaps, engine)?)
            }
            QueryNode::Repeats { node, min, max } => {
                Box::new(RepeatsExecutor::new(query, node, *min, *max, engine)?)
            }
            QueryNode::Annotation { .. } => Box::new(annotation_executor(&query, engine)?),
        };
        Ok(executor)
    }

    /// Parameter and name checks for this node alone
    fn check(&self, engine: &Engine) -> Result<()> {
        match self {
            QueryNode::Term {
                index,
                index_type,
                length,
                ..
            } => {
                term_length(*index_type, *length)?;
                engine.index(index, *index_type)?;
            }
            QueryNode::Or { .. } => {}
            QueryNode::And { nodes } => {
                if nodes.is_empty() {
                    return Err(QueryError::InvalidQuery(
                        "AND needs at least one sub-query".to_string(),
                    ));
                }
            }
            QueryNode::Within { .. } | QueryNode::Contains { .. } | QueryNode::Gap { .. } => {}
            QueryNode::Sequence { nodes, gaps } => {
                sequence_gaps(nodes.len(), gaps.as_deref())?;
            }
            QueryNode::Repeats { min, max, .. } => {
                if *min == 0 || min > max {
                    return Err(QueryError::InvalidQuery(format!(
                        "repeat bounds must satisfy 1 <= min <= max, got [{}, {}]",
                        min, max
                    )));
                }
            }
            QueryNode::Annotation {
                annotation_type,
                constraints,
            } => {
                engine.annotation_helper(annotation_type)?;
                engine.annotation_index(annotation_type)?;
                for constraint in constraints {
                    constraint.compile()?;
                }
            }
        }
        Ok(())
    }
}

/// Hit length for a term node
pub(crate) fn term_length(index_type: IndexType, length: Option<u32>) -> Result<u32> {
    match (index_type, length) {
        (_, Some(0)) => Err(QueryError::InvalidQuery(
            "term hit length must be at least 1".to_string(),
        )),
        (_, Some(length)) => Ok(length),
        (IndexType::Tokens, None) => Ok(1),
        (IndexType::Annotations, None) => Err(QueryError::InvalidQuery(
            "annotation term queries need a mention length".to_string(),
        )),
    }
}

/// One gap per adjacent pair; missing gaps mean adjacency
fn sequence_gaps(len: usize, gaps: Option<&[Gap]>) -> Result<Vec<Gap>> {
    if len == 0 {
        return Err(QueryError::InvalidQuery(
            "sequence needs at least one sub-query".to_string(),
        ));
    }
    let Some(gaps) = gaps else {
        return Ok(vec![Gap::ADJACENT; len - 1]);
    };
    if gaps.len() != len - 1 {
        return Err(QueryError::InvalidQuery(format!(
            "sequence of {} sub-queries needs {} gaps, got {}",
            len,
            len - 1,
            gaps.len()
        )));
    }
    if let Some(bad) = gaps.iter().find(|g| g.min > g.max) {
        return Err(QueryError::InvalidQuery(format!(
            "gap minimum {} exceeds maximum {}",
            bad.min, bad.max
        )));
    }
    Ok(gaps.to_vec())
}
