//! Command-line surface: argument parsing and request-shape construction.
//!
//! Everything here stays at the outermost boundary; the core's selection
//! and run APIs never read argv and never terminate the process.

pub mod args;

pub use args::Cli;
