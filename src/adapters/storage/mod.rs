//! Storage Adapters
//!
//! Implementations of the SessionStore and RunRegistry ports.
//!
//! ## Available Adapters
//!
//! - **FileSessionStore** - Stores sessions as YAML files on disk
//! - **InMemorySessionStore** - Stores sessions in memory (testing/development)
//! - **InMemoryRunRegistry** - Stores run snapshots in memory
//!
//! ## Usage
//!
//! ```ignore
//! use adapters::storage::{FileSessionStore, InMemorySessionStore};
//!
//! // Single-process deployment: file-based storage
//! let store = FileSessionStore::new("./data/sessions");
//!
//! // Testing: in-memory storage
//! let store = InMemorySessionStore::new();
//! ```

mod file_session_store;
mod in_memory_run_registry;
mod in_memory_session_store;

pub use file_session_store::FileSessionStore;
pub use in_memory_run_registry::InMemoryRunRegistry;
pub use in_memory_session_store::InMemorySessionStore;
