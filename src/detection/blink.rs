//! Blink detectors
//!
//! A blink is a period in which the tracker lost the eye: gaze coordinates
//! carry the missing-value sentinel, or the pupil channel collapses.

use super::runs::RunFilter;
use super::EventDetector;
use crate::events::types::EventType;
use crate::signal::samples::GazeSamples;

/// Whether `value` is the missing-value sentinel (NaN matches NaN)
fn is_missing(value: f64, sentinel: f64) -> bool {
    if sentinel.is_nan() {
        value.is_nan()
    } else {
        value == sentinel
    }
}

/// Flags samples whose gaze coordinates are missing
#[derive(Debug, Clone, PartialEq)]
pub struct MissingDataBlinkDetector {
    filter: RunFilter,
    missing_value: f64,
}

impl MissingDataBlinkDetector {
    pub fn new(filter: RunFilter, missing_value: f64) -> Self {
        Self {
            filter,
            missing_value,
        }
    }

    pub fn missing_value(&self) -> f64 {
        self.missing_value
    }
}

impl EventDetector for MissingDataBlinkDetector {
    fn event_type(&self) -> EventType {
        EventType::Blink
    }

    fn run_filter(&self) -> &RunFilter {
        &self.filter
    }

    fn find_candidates(&self, samples: &GazeSamples) -> crate::Result<Vec<bool>> {
        Ok(samples
            .x
            .iter()
            .zip(&samples.y)
            .map(|(&x, &y)| is_missing(x, self.missing_value) || is_missing(y, self.missing_value))
            .collect())
    }
}

/// Flags samples whose pupil size is missing or non-positive
#[derive(Debug, Clone, PartialEq)]
pub struct PupilSizeBlinkDetector {
    filter: RunFilter,
    missing_value: f64,
}

impl PupilSizeBlinkDetector {
    pub fn new(filter: RunFilter, missing_value: f64) -> Self {
        Self {
            filter,
            missing_value,
        }
    }
}

impl EventDetector for PupilSizeBlinkDetector {
    fn event_type(&self) -> EventType {
        EventType::Blink
    }

    fn run_filter(&self) -> &RunFilter {
        &self.filter
    }

    fn find_candidates(&self, samples: &GazeSamples) -> crate::Result<Vec<bool>> {
        if !samples.has_pupil_size() && !samples.is_empty() {
            return Err(crate::Error::InvalidInput(
                "pupil-size blink detection needs a pupil_size channel".to_string(),
            ));
        }
        Ok(samples
            .pupil_size
            .iter()
            .map(|&p| p.is_nan() || is_missing(p, self.missing_value) || p <= 0.0)
            .collect())
    }
}
