//! CLI command handlers

pub mod check;
pub mod ingest;

pub use check::run_check;
pub use ingest::run_ingest;
