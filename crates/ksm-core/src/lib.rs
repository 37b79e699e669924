pub mod client;
pub mod error;
pub mod memory;
pub mod privacy;
pub mod tags;

pub use client::MemoryClient;
pub use error::{ClientError, ClientResult};
pub use memory::{
    AddResult, ListResult, MemoryRecord, MemoryScope, MemoryType, Metadata, Profile,
    ProfileResult, SearchHit, SearchResult,
};
pub use privacy::{is_fully_private, strip_private_content};
pub use tags::{ContainerTags, HashedTagResolver, TagResolver};
