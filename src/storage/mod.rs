//! Dictionary persistence
//!
//! - [`StorageBackend`]: keyed blob storage (filesystem or in-memory)
//! - [`DictionaryStore`]: snapshot writes and degrade-to-empty reads

mod backend;
mod store;

pub use backend::{FileBackend, MemoryBackend, StorageBackend};
pub use store::{DictionaryStore, RetryPolicy};
