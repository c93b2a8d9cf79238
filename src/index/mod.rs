//! Summary and vector indexes with their query engines.

mod prompts;
pub mod summary;
pub mod types;
pub mod vector;

pub use summary::SummaryIndex;
pub use types::{IndexError, QueryEngine, QueryError, QueryResponse, SourceNode};
pub use vector::VectorIndex;
