mod pose;
mod temporal_feature;
mod window;

pub use pose::{BoundingBox, CONFIDENCE_THRESHOLD, Joint, JointName, Pose};
pub use temporal_feature::TemporalFeature;
pub use window::Window;

/// Every pose detected in one camera tick.
pub type PoseSet = TemporalFeature<Vec<Pose>>;

/// Cumulative repetition estimate for the window ending at `id`.
pub type CumulativeCount = TemporalFeature<f32>;
