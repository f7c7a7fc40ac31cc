pub mod search;
pub mod stats;
pub mod store;
pub mod types;

pub use search::{RetrievalQuery, RetrievalRanker, ScoredEntry};
pub use stats::MemoryStats;
pub use store::MemoryStore;
pub use types::{MemoryEntry, MemoryKind, DEFAULT_IMPORTANCE};
