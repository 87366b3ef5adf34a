//! # semq - semantic search query engine
//!
//! Executes structured queries over a collection whose documents carry a
//! token stream per feature and semantic annotations over token spans.
//!
//! ## Architecture
//!
//! - [`index`] - in-memory positional sub-indexes, reader pools and corpus loading
//! - [`engine`] - the handle every query is compiled against
//! - [`annotation`] - semantic annotation helpers and feature constraints
//! - [`query`] - the query node algebra and its streaming executors
//! - [`terms`] - term enumeration queries
//! - [`error`] - the crate error type
//!
//! ## Quick Start
//!
//! ```ignore
//! use semq::index::{Corpus, IndexBuilder, IndexConfig};
//! use semq::query::{QueryNode, QueryRunner};
//!
//! let corpus = Corpus::load(Path::new("corpus.json"))?;
//! let config = IndexConfig::default().with_corpus_annotations(&corpus);
//! let engine = IndexBuilder::new(config).build(&corpus)?;
//!
//! // "to" inside any Interval annotation
//! let query = QueryNode::within(
//!     QueryNode::term("string", "to"),
//!     QueryNode::annotation("Interval", Vec::new()),
//! );
//! for document in QueryRunner::new(&engine).run(&query)? {
//!     println!("{}: {} hits", document.document, document.hits.len());
//! }
//! ```
//!
//! ## Execution model
//!
//! Queries are pulled: the caller asks the root executor for the next
//! document, then for that document's hits, and each composite executor
//! pulls from its children the same way. Nothing runs in the background.
//! Wide disjunctions keep a bounded number of child executors open through
//! [`query::ExecutorsList`].

pub mod annotation;
pub mod engine;
pub mod error;
pub mod index;
pub mod query;
pub mod terms;

pub use engine::Engine;
pub use error::{QueryError, Result};
