//! # Gaze LWS
//!
//! Turns a raw single-eye gaze trace recorded during a visual-search trial into
//! a labeled sequence of blinks, saccades and fixations, then classifies the
//! fixations that are "looking without seeing" (LWS) instances: fixations that
//! land near a target the subject has not yet identified.
//!
//! ## Quick Start
//!
//! ```no_run
//! use gaze_lws::app::config::Config;
//! use gaze_lws::lws::trial::LwsTrial;
//! use gaze_lws::workflow::TrialProcessor;
//!
//! let config = Config::default();
//! let trial = LwsTrial::load(std::path::Path::new("trial_001.json")).expect("load");
//!
//! let processor = TrialProcessor::new(config).expect("valid config");
//! let report = processor.process(&trial).expect("processing failed");
//! println!("LWS rate: {:.3}", report.lws_rate);
//! ```
//!
//! ## Architecture
//!
//! - [`signal`]: numeric kernels (shift, windowed derivative, robust SD,
//!   angular velocity) and screen geometry
//! - [`detection`]: per-sample blink/saccade/fixation detectors and the shared
//!   run post-filter
//! - [`events`]: gaze event records and the mask-to-event extractor
//! - [`lws`]: trial model, target proximity/identification and the LWS
//!   instance classifier
//! - [`workflow`]: the per-trial processing pipeline and its report
//! - [`app`]: CLI and configuration management
//!
//! ## Data Flow
//!
//! ```text
//! ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//! │ t, x, y, tr │───▶│  Detectors  │───▶│  Extractor  │───▶│ Gaze events │
//! │  (samples)  │    │   (masks)   │    │   (runs)    │    │ (+targets)  │
//! └─────────────┘    └─────────────┘    └─────────────┘    └─────────────┘
//!                                                                 │
//!                                                                 ▼
//!                                       ┌─────────────┐    ┌─────────────┐
//!                                       │ LWS labels  │◀───│  Backward   │
//!                                       │   & rate    │    │ classifier  │
//!                                       └─────────────┘    └─────────────┘
//! ```

pub mod signal;
pub mod detection;
pub mod events;
pub mod lws;
pub mod workflow;
pub mod app;

// Re-export commonly used types
pub use detection::{build_detector, Detector, DetectorParams, EventDetector, EventMasks};
pub use events::types::{EventType, FixationEvent, GazeEvent};
pub use lws::trial::{LwsTrial, Stimulus, Target};
pub use signal::samples::GazeSamples;
pub use signal::geometry::{ScreenMonitor, ViewingGeometry};
pub use workflow::{TrialProcessor, TrialReport};

/// Result type alias for gaze-lws
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for gaze-lws
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Length mismatch: {0}")]
    LengthMismatch(String),

    #[error("Unknown event detector type: {0}")]
    UnknownDetector(String),

    #[error("Missing required parameter `{parameter}` for {detector} detector")]
    MissingParameter {
        detector: &'static str,
        parameter: &'static str,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invariant violation: {0}")]
    Invariant(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
