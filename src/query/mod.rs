//! Query compilation and execution
//!
//! [`QueryNode`] trees are compiled against an [`Engine`](crate::engine::Engine)
//! into [`QueryExecutor`] trees, which stream matching documents and their
//! hits as [`Binding`]s.

pub mod and;
pub mod annotation;
pub mod binding;
pub mod executor;
pub mod executors_list;
pub mod gap;
pub mod node;
pub mod or;
pub mod overlap;
pub mod repeats;
pub mod runner;
pub mod sequence;
pub mod term;

pub use binding::Binding;
pub use executor::{QueryExecutor, converge, drain_hits};
pub use executors_list::ExecutorsList;
pub use node::{Gap, QueryNode};
pub use or::OrExecutor;
pub use overlap::{OverlapExecutor, OverlapTarget};
pub use runner::{DocumentHits, DocumentHitsView, HitView, QueryRunner};
pub use term::TermExecutor;

#[cfg(test)]
pub(crate) mod testing;
