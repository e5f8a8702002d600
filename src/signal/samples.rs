//! Gaze sample stream
//!
//! Parallel per-sample channels for one eye. Missing gaze or pupil values are
//! NaN in memory and `null` on disk.

use serde::{Deserialize, Serialize};

/// Serialize `Vec<f64>` with NaN written as `null` (JSON has no NaN)
pub(crate) mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        let nullable: Vec<Option<f64>> = values
            .iter()
            .map(|v| if v.is_nan() { None } else { Some(*v) })
            .collect();
        nullable.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let nullable = Vec::<Option<f64>>::deserialize(deserializer)?;
        Ok(nullable.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    }
}

/// Single-eye gaze trace with equal-length channels
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GazeSamples {
    /// Sample timestamps (ms), non-decreasing
    #[serde(with = "nan_as_null")]
    pub timestamp_ms: Vec<f64>,
    /// Horizontal gaze position (px)
    #[serde(with = "nan_as_null")]
    pub x: Vec<f64>,
    /// Vertical gaze position (px)
    #[serde(with = "nan_as_null")]
    pub y: Vec<f64>,
    /// Pupil size; empty when the recording has no pupil channel
    #[serde(default, with = "nan_as_null")]
    pub pupil_size: Vec<f64>,
    /// Trigger code fired at each sample; empty when no triggers were recorded
    #[serde(default)]
    pub trigger: Vec<Option<u16>>,
}

impl GazeSamples {
    /// Create a validated stream without pupil or trigger channels
    pub fn new(timestamp_ms: Vec<f64>, x: Vec<f64>, y: Vec<f64>) -> crate::Result<Self> {
        let samples = Self {
            timestamp_ms,
            x,
            y,
            pupil_size: Vec::new(),
            trigger: Vec::new(),
        };
        samples.validate()?;
        Ok(samples)
    }

    /// Create a stream with evenly spaced timestamps starting at 0 ms
    pub fn from_xy(sampling_rate: f64, x: Vec<f64>, y: Vec<f64>) -> crate::Result<Self> {
        if !sampling_rate.is_finite() || sampling_rate <= 0.0 {
            return Err(crate::Error::InvalidInput(format!(
                "sampling rate must be positive and finite, got {}",
                sampling_rate
            )));
        }
        let period_ms = 1000.0 / sampling_rate;
        let timestamp_ms = (0..x.len()).map(|i| i as f64 * period_ms).collect();
        Self::new(timestamp_ms, x, y)
    }

    /// Attach a pupil-size channel
    pub fn with_pupil_size(mut self, pupil_size: Vec<f64>) -> crate::Result<Self> {
        self.pupil_size = pupil_size;
        self.validate()?;
        Ok(self)
    }

    /// Attach a trigger channel
    pub fn with_triggers(mut self, trigger: Vec<Option<u16>>) -> crate::Result<Self> {
        self.trigger = trigger;
        self.validate()?;
        Ok(self)
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.timestamp_ms.len()
    }

    /// Check if the stream has no samples
    pub fn is_empty(&self) -> bool {
        self.timestamp_ms.is_empty()
    }

    /// Whether a pupil channel was recorded
    pub fn has_pupil_size(&self) -> bool {
        !self.pupil_size.is_empty()
    }

    /// Trigger fired at sample `index`, if any
    pub fn trigger_at(&self, index: usize) -> Option<u16> {
        self.trigger.get(index).copied().flatten()
    }

    /// Timestamp of the last sample (ms)
    pub fn end_time(&self) -> Option<f64> {
        self.timestamp_ms.last().copied()
    }

    /// Validate channel lengths and timestamps.
    ///
    /// Optional channels (pupil, trigger) may be empty; otherwise every channel
    /// must have one value per timestamp.
    pub fn validate(&self) -> crate::Result<()> {
        let n = self.timestamp_ms.len();
        let channels = [
            ("x", self.x.len(), false),
            ("y", self.y.len(), false),
            ("pupil_size", self.pupil_size.len(), true),
            ("trigger", self.trigger.len(), true),
        ];
        for (name, len, optional) in channels {
            if len != n && !(optional && len == 0) {
                return Err(crate::Error::LengthMismatch(format!(
                    "{} has {} samples but timestamps have {}",
                    name, len, n
                )));
            }
        }

        if let Some(bad) = self.timestamp_ms.iter().find(|t| !t.is_finite() || **t < 0.0) {
            return Err(crate::Error::InvalidInput(format!(
                "timestamps must be finite and non-negative, found {}",
                bad
            )));
        }
        if let Some(i) = self.timestamp_ms.windows(2).position(|w| w[1] < w[0]) {
            return Err(crate::Error::InvalidInput(format!(
                "timestamps must be non-decreasing, but sample {} ({}) precedes sample {} ({})",
                i,
                self.timestamp_ms[i],
                i + 1,
                self.timestamp_ms[i + 1]
            )));
        }
        Ok(())
    }
}
