pub mod client;

pub use client::{SearchOptions, SupermemoryClient, DEFAULT_API_URL};
