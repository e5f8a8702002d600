//! Per-sample event detection
//!
//! Each detector turns a gaze stream into a boolean mask for one event
//! family. Detectors are picked by tag through [`build_detector`], which
//! resolves to the closed [`Detector`] enum.
//!
//! | Tag | Family | Criterion |
//! |-----|--------|-----------|
//! | `missing_data` | blink | gaze coordinate equals the missing sentinel |
//! | `pupil_size` | blink | pupil size missing or non-positive |
//! | `engbert` | saccade | velocity outside the λ·σ noise ellipse |
//! | `ivt` | fixation | angular velocity under a threshold |
//! | `idt` | fixation | window dispersion under a threshold |

pub mod runs;
pub mod blink;
pub mod saccade;
pub mod fixation;

pub use blink::{MissingDataBlinkDetector, PupilSizeBlinkDetector};
pub use fixation::{IdtFixationDetector, IvtFixationDetector};
pub use runs::RunFilter;
pub use saccade::EngbertSaccadeDetector;

use crate::app::config::{DetectionConfig, EventConfig};
use crate::events::types::EventType;
use crate::signal::geometry::ViewingGeometry;
use crate::signal::samples::GazeSamples;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// A per-sample classifier for one event family
pub trait EventDetector {
    /// Family this detector produces
    fn event_type(&self) -> EventType;

    /// Shared timing post-filter
    fn run_filter(&self) -> &RunFilter;

    /// Raw per-sample candidates, one per sample, before merging and
    /// duration filtering
    fn find_candidates(&self, samples: &GazeSamples) -> crate::Result<Vec<bool>>;

    /// Final event mask, `true` only for samples of a surviving run
    fn detect(&self, samples: &GazeSamples) -> crate::Result<Vec<bool>> {
        samples.validate()?;
        let candidates = self.find_candidates(samples)?;
        if candidates.len() != samples.len() {
            return Err(crate::Error::LengthMismatch(format!(
                "{} detector produced {} candidates for {} samples",
                self.event_type(),
                candidates.len(),
                samples.len()
            )));
        }

        let mask = self.run_filter().apply(&candidates);
        debug!(
            event_type = %self.event_type(),
            candidates = candidates.iter().filter(|&&c| c).count(),
            detected = mask.iter().filter(|&&m| m).count(),
            "Detection finished"
        );
        Ok(mask)
    }
}

/// Detector variant, parsed from a case-insensitive tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectorKind {
    MissingData,
    PupilSize,
    Engbert,
    Ivt,
    Idt,
}

impl DetectorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingData => "missing_data",
            Self::PupilSize => "pupil_size",
            Self::Engbert => "engbert",
            Self::Ivt => "ivt",
            Self::Idt => "idt",
        }
    }

    /// Family the variant detects
    pub fn event_type(&self) -> EventType {
        match self {
            Self::MissingData | Self::PupilSize => EventType::Blink,
            Self::Engbert => EventType::Saccade,
            Self::Ivt | Self::Idt => EventType::Fixation,
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetectorKind {
    type Err = crate::Error;

    fn from_str(tag: &str) -> crate::Result<Self> {
        match tag.trim().to_lowercase().replace(' ', "_").as_str() {
            "missing_data" => Ok(Self::MissingData),
            "pupil_size" => Ok(Self::PupilSize),
            "engbert" => Ok(Self::Engbert),
            "ivt" => Ok(Self::Ivt),
            "idt" => Ok(Self::Idt),
            _ => Err(crate::Error::UnknownDetector(tag.to_string())),
        }
    }
}

/// Construction parameters for [`build_detector`]
///
/// The timing fields are shared by every variant; the optional ones are
/// only read by the variants that need them.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorParams {
    /// Sampling rate (Hz)
    pub sampling_rate: f64,
    /// Minimum event duration (ms)
    pub min_duration_ms: f64,
    /// Largest bridged gap between candidate runs (ms)
    pub inter_event_time_ms: f64,
    /// Missing-value sentinel for blink detectors; NaN when unset
    pub missing_value: Option<f64>,
    /// Engbert: derivative half-window (samples)
    pub derivation_window_size: Option<usize>,
    /// Engbert: noise multiplier λ
    pub lambda_noise_threshold: Option<f64>,
    /// I-VT: maximum angular velocity (deg/s)
    pub velocity_threshold: Option<f64>,
    /// I-DT: maximum window dispersion (px)
    pub dispersion_threshold: Option<f64>,
    /// I-VT: screen geometry for the angular conversion
    pub geometry: Option<ViewingGeometry>,
}

impl DetectorParams {
    /// Timing-only parameters; variant keywords start unset
    pub fn new(sampling_rate: f64, min_duration_ms: f64, inter_event_time_ms: f64) -> Self {
        Self {
            sampling_rate,
            min_duration_ms,
            inter_event_time_ms,
            missing_value: None,
            derivation_window_size: None,
            lambda_noise_threshold: None,
            velocity_threshold: None,
            dispersion_threshold: None,
            geometry: None,
        }
    }

    /// Parameters for one family, taken from the configuration
    pub fn from_config(
        event_type: EventType,
        detection: &DetectionConfig,
        events: &EventConfig,
        geometry: &ViewingGeometry,
        sampling_rate: f64,
    ) -> Self {
        let min_duration_ms = match event_type {
            EventType::Blink => events.blink_min_duration_ms,
            EventType::Saccade => events.saccade_min_duration_ms,
            EventType::Fixation => events.fixation_min_duration_ms,
        };
        Self {
            missing_value: detection.missing_value,
            derivation_window_size: Some(detection.derivation_window_size),
            lambda_noise_threshold: Some(detection.lambda_noise_threshold),
            velocity_threshold: Some(detection.ivt_velocity_threshold_deg),
            dispersion_threshold: Some(detection.idt_dispersion_threshold_px),
            geometry: Some(*geometry),
            ..Self::new(sampling_rate, min_duration_ms, detection.inter_event_time_ms)
        }
    }

    fn require<T: Copy>(value: Option<T>, kind: DetectorKind, parameter: &'static str) -> crate::Result<T> {
        value.ok_or(crate::Error::MissingParameter {
            detector: kind.as_str(),
            parameter,
        })
    }
}

/// Closed set of detector variants
#[derive(Debug, Clone, PartialEq)]
pub enum Detector {
    MissingData(MissingDataBlinkDetector),
    PupilSize(PupilSizeBlinkDetector),
    Engbert(EngbertSaccadeDetector),
    Ivt(IvtFixationDetector),
    Idt(IdtFixationDetector),
}

impl Detector {
    pub fn kind(&self) -> DetectorKind {
        match self {
            Self::MissingData(_) => DetectorKind::MissingData,
            Self::PupilSize(_) => DetectorKind::PupilSize,
            Self::Engbert(_) => DetectorKind::Engbert,
            Self::Ivt(_) => DetectorKind::Ivt,
            Self::Idt(_) => DetectorKind::Idt,
        }
    }

    fn inner(&self) -> &dyn EventDetector {
        match self {
            Self::MissingData(d) => d,
            Self::PupilSize(d) => d,
            Self::Engbert(d) => d,
            Self::Ivt(d) => d,
            Self::Idt(d) => d,
        }
    }
}

impl EventDetector for Detector {
    fn event_type(&self) -> EventType {
        self.inner().event_type()
    }

    fn run_filter(&self) -> &RunFilter {
        self.inner().run_filter()
    }

    fn find_candidates(&self, samples: &GazeSamples) -> crate::Result<Vec<bool>> {
        self.inner().find_candidates(samples)
    }
}

/// Build a detector from its tag.
///
/// Fails with [`crate::Error::UnknownDetector`] for unrecognised tags and
/// [`crate::Error::MissingParameter`] when a variant keyword is absent.
pub fn build_detector(tag: &str, params: &DetectorParams) -> crate::Result<Detector> {
    let kind: DetectorKind = tag.parse()?;
    let filter = RunFilter::new(params.sampling_rate, params.min_duration_ms, params.inter_event_time_ms)?;
    let missing_value = params.missing_value.unwrap_or(f64::NAN);

    let detector = match kind {
        DetectorKind::MissingData => Detector::MissingData(MissingDataBlinkDetector::new(filter, missing_value)),
        DetectorKind::PupilSize => Detector::PupilSize(PupilSizeBlinkDetector::new(filter, missing_value)),
        DetectorKind::Engbert => Detector::Engbert(EngbertSaccadeDetector::new(
            filter,
            DetectorParams::require(params.derivation_window_size, kind, "derivation_window_size")?,
            DetectorParams::require(params.lambda_noise_threshold, kind, "lambda_noise_threshold")?,
        )?),
        DetectorKind::Ivt => Detector::Ivt(IvtFixationDetector::new(
            filter,
            DetectorParams::require(params.velocity_threshold, kind, "velocity_threshold")?,
            DetectorParams::require(params.geometry, kind, "geometry")?,
        )?),
        DetectorKind::Idt => Detector::Idt(IdtFixationDetector::new(
            filter,
            DetectorParams::require(params.dispersion_threshold, kind, "dispersion_threshold")?,
        )?),
    };
    debug!(detector = %kind, "Built detector");
    Ok(detector)
}

/// Final masks of all three families, one value per sample each
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventMasks {
    pub is_blink: Vec<bool>,
    pub is_saccade: Vec<bool>,
    pub is_fixation: Vec<bool>,
}

impl EventMasks {
    /// All-false masks for `n` samples
    pub fn empty(n: usize) -> Self {
        Self {
            is_blink: vec![false; n],
            is_saccade: vec![false; n],
            is_fixation: vec![false; n],
        }
    }

    pub fn mask(&self, event_type: EventType) -> &[bool] {
        match event_type {
            EventType::Blink => &self.is_blink,
            EventType::Saccade => &self.is_saccade,
            EventType::Fixation => &self.is_fixation,
        }
    }

    fn mask_mut(&mut self, event_type: EventType) -> &mut Vec<bool> {
        match event_type {
            EventType::Blink => &mut self.is_blink,
            EventType::Saccade => &mut self.is_saccade,
            EventType::Fixation => &mut self.is_fixation,
        }
    }
}

/// Run the configured detector of each family.
///
/// A family without a detector tag gets an all-false mask. A tag whose
/// variant belongs to another family is a configuration error.
pub fn detect_all_events(
    samples: &GazeSamples,
    detection: &DetectionConfig,
    events: &EventConfig,
    geometry: &ViewingGeometry,
    sampling_rate: f64,
) -> crate::Result<EventMasks> {
    let mut masks = EventMasks::empty(samples.len());

    for event_type in EventType::ALL {
        let Some(tag) = detection.detector_tag(event_type) else {
            debug!(event_type = %event_type, "No detector configured");
            continue;
        };
        let params = DetectorParams::from_config(event_type, detection, events, geometry, sampling_rate);
        let detector = build_detector(tag, &params)?;
        if detector.event_type() != event_type {
            return Err(crate::Error::Config(format!(
                "detector `{}` finds {} events and cannot be used as the {} detector",
                detector.kind(),
                detector.event_type(),
                event_type
            )));
        }
        *masks.mask_mut(event_type) = detector.detect(samples)?;
    }

    Ok(masks)
}
