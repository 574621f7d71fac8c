//! Document storage.
//!
//! This module provides the store abstraction the graph reads and writes
//! through, and two backends:
//! - `MemoryStore`: process-local maps, for tests and embedding
//! - `FileStore`: `MemoryStore` persisted to a JSON file

mod file;
mod memory;
mod traits;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use traits::*;

use std::sync::Arc;

use crate::config::{Config, StoreBackendType};
use crate::error::Result;

/// Create a document store from configuration.
pub async fn create_store(config: &Config) -> Result<Arc<dyn DocumentStore>> {
    match config.store.backend {
        StoreBackendType::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreBackendType::File => {
            let store = FileStore::open(&config.data_dir()).await?;
            Ok(Arc::new(store))
        }
    }
}
