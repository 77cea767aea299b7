//! Batch interfaces used by the CLI.

pub mod csv;
