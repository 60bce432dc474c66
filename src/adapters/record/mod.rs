//! Record Source Adapters.
//!
//! Implementations of the RecordSource port for the upstream document
//! system.
//!
//! ## Available Adapters
//!
//! - `FixtureRecordSource` - YAML fixture files for development and tests
//! - `HttpRecordSource` - Upstream record service over HTTP

mod fixture_record_source;
mod http_record_source;
mod payload;

pub use fixture_record_source::FixtureRecordSource;
pub use http_record_source::{HttpRecordSource, RecordApiConfig};
