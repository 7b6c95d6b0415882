//! CLI module for HomeOps Doctor
//!
//! Handles command-line argument parsing and snapshot file loading.

pub mod args;
pub mod input;

pub use args::{Args, Commands, OutputFormat, Verbosity};
pub use input::{load_registry, load_snapshot};
