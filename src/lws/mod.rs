//! Looking-without-seeing analysis
//!
//! - [`trial`]: trial, stimulus and target model with JSON persistence
//! - [`proximity`]: gaze-to-target visual angles
//! - [`identification`]: when each target was identified
//! - [`instances`]: backward LWS classification and the LWS rate

pub mod trial;
pub mod proximity;
pub mod identification;
pub mod instances;

pub use identification::{find_sequences_in_sparse_array, identify_targets, TargetIdentification};
pub use instances::{calculate_lws_rate, LwsClassifier};
pub use proximity::{closest_target, SampleProximity};
pub use trial::{LwsTrial, Rect, Stimulus, Target};
