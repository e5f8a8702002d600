//! Gaze events
//!
//! Event records (blink, saccade, fixation) and the extractor that turns
//! detector masks into an ordered event list.

pub mod types;
pub mod extraction;

pub use extraction::EventExtractor;
pub use types::{
    BlinkEvent, EventContext, EventSpan, EventSummary, EventType, FixationEvent, GazeEvent,
    GazeEventInfo, OutlierReason, SaccadeEvent,
};
