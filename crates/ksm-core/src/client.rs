use crate::error::ClientResult;
use crate::memory::{AddResult, ListResult, Metadata, ProfileResult, SearchResult};

/// Remote memory service. Every call either yields its payload or a typed failure.
pub trait MemoryClient: Send + Sync {
    // CRUD
    fn add(&self, content: &str, container_tag: &str, metadata: &Metadata)
        -> ClientResult<AddResult>;
    fn delete(&self, id: &str) -> ClientResult<()>;

    // Retrieval
    fn search(&self, query: &str, container_tag: &str) -> ClientResult<SearchResult>;
    fn list(&self, container_tag: &str, limit: usize) -> ClientResult<ListResult>;
    fn profile(&self, container_tag: &str, query: Option<&str>) -> ClientResult<ProfileResult>;
}
