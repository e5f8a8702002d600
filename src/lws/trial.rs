//! Visual-search trial model
//!
//! One trial is a single stimulus presentation: the target array shown on
//! screen and the gaze recorded while the subject searched it. Trials are
//! stored as JSON with missing samples written as `null`.

use crate::signal::samples::GazeSamples;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Current trial file format version
pub const CURRENT_FORMAT_VERSION: &str = "1.0";

fn default_format_version() -> String {
    CURRENT_FORMAT_VERSION.to_string()
}

/// A search target on the stimulus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: usize,
    /// Icon center (px)
    pub center_x: f64,
    pub center_y: f64,
    /// Icon category (face, animal, ...)
    #[serde(default)]
    pub category: String,
}

impl Target {
    pub fn new(id: usize, center_x: f64, center_y: f64, category: impl Into<String>) -> Self {
        Self {
            id,
            center_x,
            center_y,
            category: category.into(),
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.center_x, self.center_y)
    }
}

/// Axis-aligned screen rectangle (y grows downwards)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub top_left: (f64, f64),
    pub bottom_right: (f64, f64),
}

impl Rect {
    pub fn new(top_left: (f64, f64), bottom_right: (f64, f64)) -> Self {
        Self {
            top_left,
            bottom_right,
        }
    }

    /// Corners must be finite, with `top_left` above and left of
    /// `bottom_right`
    pub fn validate(&self) -> crate::Result<()> {
        let (left, top) = self.top_left;
        let (right, bottom) = self.bottom_right;
        if [left, top, right, bottom].iter().any(|v| !v.is_finite()) || left > right || top > bottom {
            return Err(crate::Error::InvalidInput(format!(
                "rectangle {:?} -> {:?} is not valid",
                self.top_left, self.bottom_right
            )));
        }
        Ok(())
    }

    /// Closed containment test
    pub fn contains(&self, point: (f64, f64)) -> bool {
        (self.top_left.0..=self.bottom_right.0).contains(&point.0)
            && (self.top_left.1..=self.bottom_right.1).contains(&point.1)
    }
}

/// The target array shown during a trial
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stimulus {
    pub targets: Vec<Target>,
    /// Target-helper strip; the configured strip applies when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_helper_strip: Option<Rect>,
}

impl Stimulus {
    pub fn new(targets: Vec<Target>) -> Self {
        Self {
            targets,
            target_helper_strip: None,
        }
    }

    pub fn num_targets(&self) -> usize {
        self.targets.len()
    }

    pub fn target(&self, id: usize) -> Option<&Target> {
        self.targets.iter().find(|t| t.id == id)
    }

    /// Target ids must be unique, centers finite and the helper strip (if
    /// any) a valid rectangle
    pub fn validate(&self) -> crate::Result<()> {
        if let Some(strip) = &self.target_helper_strip {
            strip.validate()?;
        }
        let mut seen = HashSet::new();
        for target in &self.targets {
            if !target.center_x.is_finite() || !target.center_y.is_finite() {
                return Err(crate::Error::InvalidInput(format!(
                    "target {} has an invalid center ({}, {})",
                    target.id, target.center_x, target.center_y
                )));
            }
            if !seen.insert(target.id) {
                return Err(crate::Error::InvalidInput(format!(
                    "duplicate target id {}",
                    target.id
                )));
            }
        }
        Ok(())
    }
}

/// A single trial of the experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LwsTrial {
    /// File format version
    #[serde(default = "default_format_version")]
    pub format_version: String,
    pub trial_num: u32,
    #[serde(default)]
    pub subject_id: String,
    /// Sampling rate of the gaze data (Hz)
    pub sampling_rate: f64,
    pub stimulus: Stimulus,
    pub samples: GazeSamples,
}

impl LwsTrial {
    pub fn new(
        trial_num: u32,
        subject_id: impl Into<String>,
        sampling_rate: f64,
        stimulus: Stimulus,
        samples: GazeSamples,
    ) -> crate::Result<Self> {
        let trial = Self {
            format_version: default_format_version(),
            trial_num,
            subject_id: subject_id.into(),
            sampling_rate,
            stimulus,
            samples,
        };
        trial.validate()?;
        Ok(trial)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if !self.sampling_rate.is_finite() || self.sampling_rate <= 0.0 {
            return Err(crate::Error::InvalidInput(format!(
                "sampling rate must be positive and finite, got {}",
                self.sampling_rate
            )));
        }
        self.samples.validate()?;
        self.stimulus.validate()
    }

    /// Timestamp of the last gaze sample (ms); 0 for an empty trial
    pub fn end_time(&self) -> f64 {
        self.samples.end_time().unwrap_or(0.0)
    }

    /// Short identifier for logs and report file names
    pub fn name(&self) -> String {
        if self.subject_id.is_empty() {
            format!("T{:03}", self.trial_num)
        } else {
            format!("S{}_T{:03}", self.subject_id, self.trial_num)
        }
    }

    /// Save to JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from JSON file.
    ///
    /// Contents are validated; a file written by another format version
    /// still loads, with a warning.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let trial: LwsTrial = serde_json::from_str(&content)?;
        if trial.format_version != CURRENT_FORMAT_VERSION {
            tracing::warn!(
                trial = %trial.name(),
                found = %trial.format_version,
                expected = CURRENT_FORMAT_VERSION,
                "Trial has different format version; some fields may use default values"
            );
        }
        trial.validate()?;
        Ok(trial)
    }
}
