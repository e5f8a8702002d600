//! LWS instance classification
//!
//! A fixation is a "looking without seeing" instance when it lands near a
//! target the subject had not identified yet (standalone criteria) and the
//! fixation after it does not show the subject already knew (pairwise
//! criteria). Labels are decided from the last fixation backwards, since a
//! fixation's pairwise verdict can depend on its successor's label.

use super::identification::TargetIdentification;
use super::trial::Rect;
use crate::events::types::{FixationEvent, GazeEvent, GazeEventInfo};
use tracing::debug;

/// Decides the LWS label of each fixation in one trial
#[derive(Debug, Clone)]
pub struct LwsClassifier<'a> {
    /// Largest fixation-to-target visual angle still "on" the target (deg)
    pub proximity_threshold: f64,
    /// Largest same-target gap (ms) across which a label propagates
    pub max_gap_ms: f64,
    pub target_helper_strip: Rect,
    /// Timestamp of the trial's last sample (ms)
    pub trial_end_time: f64,
    identifications: &'a [TargetIdentification],
}

impl<'a> LwsClassifier<'a> {
    pub fn new(
        proximity_threshold: f64,
        max_gap_ms: f64,
        target_helper_strip: Rect,
        trial_end_time: f64,
        identifications: &'a [TargetIdentification],
    ) -> crate::Result<Self> {
        if !proximity_threshold.is_finite() || proximity_threshold <= 0.0 {
            return Err(crate::Error::Config(format!(
                "proximity threshold must be positive and finite, got {}",
                proximity_threshold
            )));
        }
        if !max_gap_ms.is_finite() || max_gap_ms < 0.0 {
            return Err(crate::Error::Config(format!(
                "maximum gap must be non-negative and finite, got {}",
                max_gap_ms
            )));
        }
        Ok(Self {
            proximity_threshold,
            max_gap_ms,
            target_helper_strip,
            trial_end_time,
            identifications,
        })
    }

    fn time_identified(&self, target_id: usize) -> Option<f64> {
        self.identifications
            .iter()
            .find(|i| i.target_id == target_id)
            .and_then(|i| i.time_identified)
    }

    /// Near a target that was not identified before the fixation ended.
    ///
    /// A fixation cut off by the end of the trial never qualifies.
    pub fn meets_standalone_criteria(&self, fixation: &FixationEvent) -> bool {
        if fixation.end_time() == self.trial_end_time {
            return false;
        }
        if fixation.visual_angle_to_closest_target > self.proximity_threshold {
            return false;
        }
        let Some(target_id) = fixation.closest_target_id else {
            return false;
        };
        match self.time_identified(target_id) {
            None => true,
            Some(time_identified) => fixation.end_time() < time_identified,
        }
    }

    /// Whether the next fixation leaves the current one's label open.
    ///
    /// A glance into the helper strip rules it out, moving to another target
    /// or pausing longer than `max_gap_ms` keeps it, and otherwise the label
    /// follows the next fixation's.
    pub fn meets_pairwise_criteria(
        &self,
        current: &FixationEvent,
        next: &FixationEvent,
        next_is_lws_instance: bool,
    ) -> bool {
        if next.is_in_rectangle(self.target_helper_strip.top_left, self.target_helper_strip.bottom_right) {
            return false;
        }
        if next.closest_target_id != current.closest_target_id {
            return true;
        }
        if next.start_time() - current.end_time() > self.max_gap_ms {
            return true;
        }
        next_is_lws_instance
    }

    /// One label per event: `Some(is_lws)` for fixations, `None` otherwise.
    ///
    /// `events` must be sorted by start time.
    pub fn identify_lws_instances(&self, events: &[GazeEvent]) -> Vec<Option<bool>> {
        let mut labels = vec![None; events.len()];
        let fixations = events
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_fixation().map(|f| (i, f)));

        let mut next: Option<(&FixationEvent, bool)> = None;
        for (i, fixation) in fixations.rev() {
            let is_lws = self.meets_standalone_criteria(fixation)
                && next.map_or(true, |(next_fixation, next_is_lws)| {
                    self.meets_pairwise_criteria(fixation, next_fixation, next_is_lws)
                });
            labels[i] = Some(is_lws);
            next = Some((fixation, is_lws));
        }

        debug!(
            fixations = labels.iter().filter(|l| l.is_some()).count(),
            lws_instances = labels.iter().filter(|l| **l == Some(true)).count(),
            "Classified LWS instances"
        );
        labels
    }
}

/// Fraction of fixations that are LWS instances.
///
/// With `proximal_threshold` set, only fixations within that many degrees of
/// their closest target count towards the denominator. Zero fixations give a
/// rate of 0 unless instances were counted anyway, which is an invariant
/// violation.
pub fn calculate_lws_rate(
    events: &[GazeEvent],
    labels: &[Option<bool>],
    proximal_threshold: Option<f64>,
) -> crate::Result<f64> {
    if events.len() != labels.len() {
        return Err(crate::Error::LengthMismatch(format!(
            "{} labels for {} events",
            labels.len(),
            events.len()
        )));
    }
    let num_instances = labels.iter().filter(|l| **l == Some(true)).count();
    let num_fixations = events
        .iter()
        .filter_map(GazeEvent::as_fixation)
        .filter(|f| proximal_threshold.map_or(true, |t| f.visual_angle_to_closest_target <= t))
        .count();

    match (num_fixations, num_instances) {
        (0, 0) => Ok(0.0),
        (0, n) => Err(crate::Error::Invariant(format!(
            "{} LWS instances but no fixations",
            n
        ))),
        (fixations, instances) => Ok(instances as f64 / fixations as f64),
    }
}
