//! Domain types for the dashboard migration orchestrator.
//!
//! This crate has no I/O: it holds the ledger record shape, run options,
//! the compiled dashboard selector, and the run summary.

pub mod config;
pub mod error;
pub mod selection;
pub mod summary;
pub mod types;
