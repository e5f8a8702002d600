//! Gaze event records
//!
//! Blinks, saccades and fixations, each owning a contiguous inclusive range
//! of the sample stream. Derived statistics and the outlier verdict are
//! computed once at construction; events are immutable afterwards.

use crate::app::config::EventConfig;
use crate::lws::proximity::closest_target;
use crate::lws::trial::Target;
use crate::signal::geometry::ViewingGeometry;
use crate::signal::samples::GazeSamples;
use crate::signal::velocity::angular_velocity;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

/// Minimum number of samples in any gaze event
pub const MIN_SAMPLES_PER_EVENT: usize = 2;

/// Trigger: subject attempted to mark a target (successfully)
pub const MARK_TARGET_SUCCESSFUL_TRIGGER: u16 = 211;
/// Trigger: subject attempted to mark a target (unsuccessfully)
pub const MARK_TARGET_UNSUCCESSFUL_TRIGGER: u16 = 212;

/// Event family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Blink,
    Saccade,
    Fixation,
}

impl EventType {
    pub const ALL: [EventType; 3] = [EventType::Blink, EventType::Saccade, EventType::Fixation];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blink => "blink",
            Self::Saccade => "saccade",
            Self::Fixation => "fixation",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an event was flagged as an outlier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierReason {
    Duration,
    MaxVelocity,
}

/// Inclusive sample range covered by an event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventSpan {
    pub start_index: usize,
    pub end_index: usize,
    /// Timestamp of the first sample (ms)
    pub start_time: f64,
    /// Timestamp of the last sample (ms)
    pub end_time: f64,
}

impl EventSpan {
    /// Build a span over `samples[start..=end]`
    pub fn from_samples(samples: &GazeSamples, start: usize, end: usize) -> crate::Result<Self> {
        if end >= samples.len() || start > end {
            return Err(crate::Error::InvalidInput(format!(
                "event range {}..={} is outside a stream of {} samples",
                start,
                end,
                samples.len()
            )));
        }
        if end - start + 1 < MIN_SAMPLES_PER_EVENT {
            return Err(crate::Error::InvalidInput(format!(
                "event must be at least {} samples long, got {}",
                MIN_SAMPLES_PER_EVENT,
                end - start + 1
            )));
        }
        let timestamps = &samples.timestamp_ms[start..=end];
        if timestamps.iter().any(|t| !t.is_finite() || *t < 0.0) {
            return Err(crate::Error::InvalidInput(
                "event timestamps must be finite and non-negative".to_string(),
            ));
        }

        Ok(Self {
            start_index: start,
            end_index: end,
            start_time: timestamps[0],
            end_time: timestamps[timestamps.len() - 1],
        })
    }

    /// Duration (ms)
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    pub fn num_samples(&self) -> usize {
        self.end_index - self.start_index + 1
    }

    pub fn indices(&self) -> RangeInclusive<usize> {
        self.start_index..=self.end_index
    }
}

/// Serializable one-row summary of an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSummary {
    pub event_type: EventType,
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
    pub is_outlier: bool,
}

/// Capability shared by every gaze event
pub trait GazeEventInfo {
    fn span(&self) -> &EventSpan;

    fn event_type(&self) -> EventType;

    /// Reasons this event is an outlier; empty when it is not
    fn outlier_reasons(&self) -> &[OutlierReason];

    fn start_time(&self) -> f64 {
        self.span().start_time
    }

    fn end_time(&self) -> f64 {
        self.span().end_time
    }

    fn duration(&self) -> f64 {
        self.span().duration()
    }

    fn is_outlier(&self) -> bool {
        !self.outlier_reasons().is_empty()
    }

    fn summary(&self) -> EventSummary {
        EventSummary {
            event_type: self.event_type(),
            start_time: self.start_time(),
            end_time: self.end_time(),
            duration: self.duration(),
            is_outlier: self.is_outlier(),
        }
    }
}

/// Mean of the non-NaN values; NaN when there are none
fn nan_mean(values: &[f64]) -> f64 {
    let (sum, count) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Max of the non-NaN values; NaN when there are none
fn nan_max(values: &[f64]) -> f64 {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(f64::NAN, f64::max)
}

/// Population standard deviation of the non-NaN values
fn nan_std(values: &[f64]) -> f64 {
    let mean = nan_mean(values);
    if mean.is_nan() {
        return f64::NAN;
    }
    nan_mean(&values.iter().map(|v| (v - mean).powi(2)).collect::<Vec<_>>()).sqrt()
}

/// Everything an event constructor needs beyond its own samples
#[derive(Debug, Clone, Copy)]
pub struct EventContext<'a> {
    pub config: &'a EventConfig,
    pub geometry: &'a ViewingGeometry,
    pub sampling_rate: f64,
    /// Stimulus targets, used to locate each fixation's closest target
    pub targets: &'a [Target],
}

/// Period of missing or invalid gaze data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlinkEvent {
    #[serde(flatten)]
    pub span: EventSpan,
    outlier_reasons: Vec<OutlierReason>,
}

impl BlinkEvent {
    pub fn new(span: EventSpan, config: &EventConfig) -> Self {
        let mut outlier_reasons = Vec::new();
        if span.duration() < config.blink_min_duration_ms {
            outlier_reasons.push(OutlierReason::Duration);
        }
        Self {
            span,
            outlier_reasons,
        }
    }
}

impl GazeEventInfo for BlinkEvent {
    fn span(&self) -> &EventSpan {
        &self.span
    }

    fn event_type(&self) -> EventType {
        EventType::Blink
    }

    fn outlier_reasons(&self) -> &[OutlierReason] {
        &self.outlier_reasons
    }
}

/// Rapid eye movement between fixations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaccadeEvent {
    #[serde(flatten)]
    pub span: EventSpan,
    /// Distance between first and last gaze position (px)
    pub amplitude_px: f64,
    /// Peak angular velocity (deg/s)
    pub peak_velocity: f64,
    /// Mean angular velocity (deg/s)
    pub mean_velocity: f64,
    outlier_reasons: Vec<OutlierReason>,
}

impl SaccadeEvent {
    pub fn new(span: EventSpan, samples: &GazeSamples, ctx: &EventContext<'_>) -> crate::Result<Self> {
        let x = &samples.x[span.indices()];
        let y = &samples.y[span.indices()];
        let velocities = angular_velocity(x, y, ctx.sampling_rate, ctx.geometry)?;
        let amplitude_px = (x[x.len() - 1] - x[0]).hypot(y[y.len() - 1] - y[0]);

        let mut outlier_reasons = Vec::new();
        let duration = span.duration();
        if duration < ctx.config.saccade_min_duration_ms || duration > ctx.config.saccade_max_duration_ms {
            outlier_reasons.push(OutlierReason::Duration);
        }

        Ok(Self {
            span,
            amplitude_px,
            peak_velocity: nan_max(&velocities),
            mean_velocity: nan_mean(&velocities),
            outlier_reasons,
        })
    }
}

impl GazeEventInfo for SaccadeEvent {
    fn span(&self) -> &EventSpan {
        &self.span
    }

    fn event_type(&self) -> EventType {
        EventType::Saccade
    }

    fn outlier_reasons(&self) -> &[OutlierReason] {
        &self.outlier_reasons
    }
}

/// Period of stable gaze
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixationEvent {
    #[serde(flatten)]
    pub span: EventSpan,
    /// Mean gaze position (px)
    pub center_of_mass: (f64, f64),
    /// Largest distance of any sample from the center of mass (px)
    pub dispersion: f64,
    /// Per-axis standard deviation of gaze position (px)
    pub standard_deviation: (f64, f64),
    /// Peak angular velocity (deg/s)
    pub max_velocity: f64,
    /// Mean angular velocity (deg/s)
    pub mean_velocity: f64,
    /// Mean pupil size; NaN without a pupil channel
    pub mean_pupil_size: f64,
    /// Triggers fired while the fixation lasted
    pub triggers: Vec<u16>,
    /// Id of the target nearest to the center of mass
    pub closest_target_id: Option<usize>,
    /// Visual angle to that target (deg); infinite when there is none
    pub visual_angle_to_closest_target: f64,
    #[serde(skip)]
    velocities: Vec<f64>,
    #[serde(skip)]
    pupil_sizes: Vec<f64>,
    outlier_reasons: Vec<OutlierReason>,
}

impl FixationEvent {
    pub fn new(span: EventSpan, samples: &GazeSamples, ctx: &EventContext<'_>) -> crate::Result<Self> {
        let x = &samples.x[span.indices()];
        let y = &samples.y[span.indices()];
        let velocities = angular_velocity(x, y, ctx.sampling_rate, ctx.geometry)?;
        let pupil_sizes = if samples.has_pupil_size() {
            samples.pupil_size[span.indices()].to_vec()
        } else {
            Vec::new()
        };
        let triggers = span.indices().filter_map(|i| samples.trigger_at(i)).collect();

        let center_of_mass = (nan_mean(x), nan_mean(y));
        let dispersion = nan_max(
            &x.iter()
                .zip(y)
                .map(|(xi, yi)| (xi - center_of_mass.0).hypot(yi - center_of_mass.1))
                .collect::<Vec<_>>(),
        );

        let (closest_target_id, visual_angle_to_closest_target) =
            match closest_target(center_of_mass, ctx.targets, ctx.geometry) {
                Some((id, angle)) => (Some(id), angle),
                None => (None, f64::INFINITY),
            };

        let max_velocity = nan_max(&velocities);
        let mut outlier_reasons = Vec::new();
        if span.duration() < ctx.config.fixation_min_duration_ms {
            outlier_reasons.push(OutlierReason::Duration);
        }
        if max_velocity > ctx.config.fixation_max_velocity_deg {
            outlier_reasons.push(OutlierReason::MaxVelocity);
        }

        Ok(Self {
            span,
            center_of_mass,
            dispersion,
            standard_deviation: (nan_std(x), nan_std(y)),
            max_velocity,
            mean_velocity: nan_mean(&velocities),
            mean_pupil_size: nan_mean(&pupil_sizes),
            triggers,
            closest_target_id,
            visual_angle_to_closest_target,
            velocities,
            pupil_sizes,
            outlier_reasons,
        })
    }

    /// Angular velocity of each sample (deg/s); the first is NaN
    pub fn velocity_series(&self) -> &[f64] {
        &self.velocities
    }

    /// Pupil size of each sample; empty without a pupil channel
    pub fn pupil_series(&self) -> &[f64] {
        &self.pupil_sizes
    }

    /// Whether the subject tried to mark a target during this fixation
    pub fn is_mark_target_attempt(&self) -> bool {
        self.triggers.iter().any(|t| {
            *t == MARK_TARGET_SUCCESSFUL_TRIGGER || *t == MARK_TARGET_UNSUCCESSFUL_TRIGGER
        })
    }

    /// Whether the center of mass lies in the closed rectangle spanned by
    /// `top_left` and `bottom_right` (screen coordinates, y grows downwards)
    pub fn is_in_rectangle(&self, top_left: (f64, f64), bottom_right: (f64, f64)) -> bool {
        let (x, y) = self.center_of_mass;
        (top_left.0..=bottom_right.0).contains(&x) && (top_left.1..=bottom_right.1).contains(&y)
    }
}

impl GazeEventInfo for FixationEvent {
    fn span(&self) -> &EventSpan {
        &self.span
    }

    fn event_type(&self) -> EventType {
        EventType::Fixation
    }

    fn outlier_reasons(&self) -> &[OutlierReason] {
        &self.outlier_reasons
    }
}

/// Any gaze event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event_type", rename_all = "lowercase")]
pub enum GazeEvent {
    Blink(BlinkEvent),
    Saccade(SaccadeEvent),
    Fixation(FixationEvent),
}

impl GazeEvent {
    pub fn as_fixation(&self) -> Option<&FixationEvent> {
        match self {
            Self::Fixation(fixation) => Some(fixation),
            _ => None,
        }
    }

    pub fn is_fixation(&self) -> bool {
        matches!(self, Self::Fixation(_))
    }
}

impl GazeEventInfo for GazeEvent {
    fn span(&self) -> &EventSpan {
        match self {
            Self::Blink(e) => e.span(),
            Self::Saccade(e) => e.span(),
            Self::Fixation(e) => e.span(),
        }
    }

    fn event_type(&self) -> EventType {
        match self {
            Self::Blink(_) => EventType::Blink,
            Self::Saccade(_) => EventType::Saccade,
            Self::Fixation(_) => EventType::Fixation,
        }
    }

    fn outlier_reasons(&self) -> &[OutlierReason] {
        match self {
            Self::Blink(e) => e.outlier_reasons(),
            Self::Saccade(e) => e.outlier_reasons(),
            Self::Fixation(e) => e.outlier_reasons(),
        }
    }
}

impl fmt::Display for GazeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.1} ms)", self.event_type(), self.duration())
    }
}
