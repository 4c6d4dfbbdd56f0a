use crate::app::RenderTarget;
use crate::common::Frame;
use crate::pipeline::types::{CONFIDENCE_THRESHOLD, Pose};

/// Stands in for a screen: logs what would be drawn.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingRenderer;

impl RenderTarget for TracingRenderer {
    fn display(&self, frame: &Frame, poses: &[Pose]) {
        let dominant = poses
            .iter()
            .filter(|pose| pose.is_drawable(CONFIDENCE_THRESHOLD))
            .max_by(|a, b| {
                a.bounding_box_area(CONFIDENCE_THRESHOLD)
                    .total_cmp(&b.bounding_box_area(CONFIDENCE_THRESHOLD))
            });
        match dominant {
            Some(pose) => tracing::trace!(
                "Frame {}: {} poses, dominant area {:.3}, wireframe scale {:.2}",
                frame.id(),
                poses.len(),
                pose.bounding_box_area(CONFIDENCE_THRESHOLD),
                pose.drawing_scale(CONFIDENCE_THRESHOLD)
            ),
            None => tracing::trace!("Frame {}: nothing to draw", frame.id()),
        }
    }
}
