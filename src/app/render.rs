use crate::common::Frame;
use crate::pipeline::types::Pose;

/// Display sink for camera frames and their poses. Calls must return
/// quickly; the display consumer is never allowed to stall counting.
pub trait RenderTarget: Send + Sync {
    fn display(&self, frame: &Frame, poses: &[Pose]);
}
