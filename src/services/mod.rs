//! Application services.
//!
//! Separated from transport concerns: the same extraction service backs
//! the HTTP handlers and the CLI.

pub mod extraction;

pub use extraction::{ExtractError, ExtractionService};
