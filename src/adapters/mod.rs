//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `storage` - Session and run persistence (in-memory, file-backed)
//! - `postgres` - PostgreSQL-backed session persistence
//! - `record` - Record source clients (fixture files, upstream HTTP)
//! - `completion` - Extraction model clients (HTTP, configurable mock)

pub mod completion;
pub mod postgres;
pub mod record;
pub mod storage;

pub use completion::{
    CompletionApiConfig, HttpCompletionService, MockCompletion, MockCompletionError,
    MockCompletionService,
};
pub use postgres::PostgresSessionStore;
pub use record::{FixtureRecordSource, HttpRecordSource, RecordApiConfig};
pub use storage::{FileSessionStore, InMemoryRunRegistry, InMemorySessionStore};
