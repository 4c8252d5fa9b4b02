//! `budgetsim-core` -- scenario simulation and resolution engine.
//!
//! Turns a scenario document (a list of fiscal-policy actions against a
//! budget baseline) into year-by-year deficit/debt paths, macro feedback,
//! target-vs-achieved resolution per mass, and compliance verdicts.
//!
//! Everything in this crate is pure, synchronous logic over immutable
//! inputs. Loading snapshots from disk, reading the environment, and
//! installing a tracing subscriber belong to the caller.

pub mod accounting;
pub mod compliance;
pub mod config;
pub mod engine;
pub mod error;
pub mod hashing;
pub mod macro_feedback;
pub mod mechanical;
pub mod normalizer;
pub mod resolution;
pub mod scenario;
pub mod sign;
pub mod snapshot;
pub mod threshold_validation;
pub mod types;
pub mod warnings;

pub use config::{EngineConfig, MacroParams};
pub use engine::{simulate, simulate_blob};
pub use error::CoreError;
pub use snapshot::{Snapshot, SnapshotStore};
pub use types::ScenarioResult;
