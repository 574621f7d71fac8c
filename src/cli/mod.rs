//! CLI module for the repograph command-line interface.
//!
//! Every command opens the configured store, runs one library operation and
//! prints the result as text or JSON.

mod commands;
mod output;

pub use commands::*;
