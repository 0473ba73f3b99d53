//! examforge-store: catalog and result store implementations.
//!
//! Implements the collaborator traits from `examforge-core` over an in-memory
//! catalog and over JSON files on disk, and loads the tool configuration.

pub mod config;
pub mod error;
pub mod file;
pub mod memory;

pub use config::{load_config, load_config_from, ExamforgeConfig};
pub use error::StoreError;
pub use file::FileResultStore;
pub use memory::{MemoryCatalog, MemoryResultStore};
