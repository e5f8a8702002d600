//! Mask-to-event extraction
//!
//! Splits the `true` samples of an event mask into maximal contiguous runs
//! and builds one event record per run. No merging happens here; gaps were
//! already resolved by the detectors' run post-filter.

use super::types::{
    BlinkEvent, EventContext, EventSpan, EventType, FixationEvent, GazeEvent, GazeEventInfo,
    SaccadeEvent,
};
use crate::detection::runs::find_runs;
use crate::detection::EventMasks;
use crate::signal::samples::GazeSamples;
use tracing::debug;

/// Builds gaze events from per-family boolean masks
pub struct EventExtractor<'a> {
    ctx: EventContext<'a>,
}

impl<'a> EventExtractor<'a> {
    pub fn new(ctx: EventContext<'a>) -> Self {
        Self { ctx }
    }

    /// Extract the events of one family, sorted by start time
    pub fn extract(
        &self,
        event_type: EventType,
        mask: &[bool],
        samples: &GazeSamples,
    ) -> crate::Result<Vec<GazeEvent>> {
        if mask.len() != samples.len() || samples.x.len() != samples.len() || samples.y.len() != samples.len() {
            return Err(crate::Error::LengthMismatch(format!(
                "is_{} mask has {} samples but the gaze stream has {} timestamps, {} x and {} y values",
                event_type,
                mask.len(),
                samples.len(),
                samples.x.len(),
                samples.y.len()
            )));
        }

        let mut events = find_runs(mask)
            .into_iter()
            .map(|(start, end)| -> crate::Result<GazeEvent> {
                let span = EventSpan::from_samples(samples, start, end)?;
                Ok(match event_type {
                    EventType::Blink => GazeEvent::Blink(BlinkEvent::new(span, self.ctx.config)),
                    EventType::Saccade => GazeEvent::Saccade(SaccadeEvent::new(span, samples, &self.ctx)?),
                    EventType::Fixation => GazeEvent::Fixation(FixationEvent::new(span, samples, &self.ctx)?),
                })
            })
            .collect::<crate::Result<Vec<_>>>()?;

        sort_by_start_time(&mut events);
        debug!(event_type = %event_type, count = events.len(), "Extracted events");
        Ok(events)
    }

    /// Extract blinks, saccades and fixations, merged into one list sorted by
    /// start time, optionally without outliers
    pub fn extract_all(
        &self,
        masks: &EventMasks,
        samples: &GazeSamples,
        drop_outliers: bool,
    ) -> crate::Result<Vec<GazeEvent>> {
        let mut events = Vec::new();
        for event_type in EventType::ALL {
            events.extend(self.extract(event_type, masks.mask(event_type), samples)?);
        }

        if drop_outliers {
            let before = events.len();
            events.retain(|e| !e.is_outlier());
            debug!(dropped = before - events.len(), "Dropped outlier events");
        }

        sort_by_start_time(&mut events);
        Ok(events)
    }
}

fn sort_by_start_time(events: &mut [GazeEvent]) {
    // stable, so same-start events keep blink/saccade/fixation order
    events.sort_by(|a, b| a.start_time().total_cmp(&b.start_time()));
}
