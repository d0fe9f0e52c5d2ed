//! Flakelab workspace-level test crate.
//!
//! This crate exists solely to host the workspace integration tests in
//! `tests/integration.rs`, which drive the full analysis pipeline across
//! the member crates:
//! - `flakelab-types`: shared wire types and JSON schemas
//! - `flakelab-stats`: trial aggregation
//! - `flakelab-significance`: confidence summaries
//! - `flakelab-domain`: classification, scoring, recommendation policy
//! - `flakelab-adapters`: suite process runner
//! - `flakelab-app`: collect/analyze use cases and Markdown reporting
//! - `flakelab` (flakelab-cli): CLI interface
