//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! This module provides adapters for PostgreSQL-backed persistence:
//! - `PostgresSessionStore` - Durable session storage with JSONB snapshots

mod session_store;

pub use session_store::PostgresSessionStore;
