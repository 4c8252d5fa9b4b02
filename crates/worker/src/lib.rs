//! `budgetsim-worker` library crate.
//!
//! Process-side glue around `budgetsim-core`: environment configuration,
//! snapshot loading from disk, and the run loop. The binary entrypoint
//! lives in `main.rs`.

pub mod config;
pub mod loader;
pub mod runner;
