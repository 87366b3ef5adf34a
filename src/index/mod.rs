pub mod build;
pub mod positional;
pub mod reader;
pub mod types;

pub use build::{Corpus, IndexBuilder};
pub use positional::{DocumentTerms, PositionalIndex};
pub use reader::{IndexReader, IndexReaderPool, PooledReader};
pub use types::*;
