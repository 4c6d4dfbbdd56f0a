//! Stand-ins for the camera, the pose model, the repetition model and the
//! screen, so the pipeline can run end to end without hardware.

pub mod camera;
pub mod estimator;
pub mod model;
pub mod renderer;

pub use camera::SyntheticCamera;
pub use estimator::MarkerPoseEstimator;
pub use model::HipDepthModel;
pub use renderer::TracingRenderer;
