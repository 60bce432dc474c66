//! Formpilot - Workflow Orchestration Engine
//!
//! This crate orchestrates document-extraction workflows that prefill
//! business forms: a user message is routed to an intent, planned into
//! pipeline stages, and executed against the record's scanned pages,
//! with per-record sessions carrying results across follow-up turns.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
