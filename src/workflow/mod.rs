//! Workflow Module
//!
//! Orchestrates per-trial processing from a loaded trial to its JSON report.

pub mod processing;

pub use processing::{ProcessingStats, TrialProcessor, TrialReport};
