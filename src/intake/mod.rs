pub mod estimator;
pub mod frame_source;

pub use estimator::{BoxEstimationService, EstimationService, PoseEstimator, estimation_service};
pub use frame_source::{FrameSource, FrameStream};
