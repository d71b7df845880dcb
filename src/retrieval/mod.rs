mod engine;
mod request;

pub use engine::{arrange, RetrievalEngine};
pub use request::{RetrievalError, RetrievalRequest, SortField, SortOrder, DEFAULT_LIMIT};
