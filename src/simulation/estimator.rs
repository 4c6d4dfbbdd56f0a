use async_trait::async_trait;

use crate::common::Frame;
use crate::error::AppError;
use crate::intake::PoseEstimator;
use crate::pipeline::types::{Joint, JointName, Pose};

/// Markers dimmer than this are treated as background noise.
const MIN_MARKER_INTENSITY: u8 = 64;
/// Markers at least this bright belong to a subject close to the camera.
const NEAR_SUBJECT_INTENSITY: u8 = 200;

/// Joint offsets from the hip centre for a full-size subject.
const SKELETON: [(JointName, f32, f32); 15] = [
    (JointName::Nose, 0.0, -0.38),
    (JointName::Neck, 0.0, -0.30),
    (JointName::LeftShoulder, -0.08, -0.28),
    (JointName::RightShoulder, 0.08, -0.28),
    (JointName::LeftElbow, -0.12, -0.16),
    (JointName::RightElbow, 0.12, -0.16),
    (JointName::LeftWrist, -0.10, -0.05),
    (JointName::RightWrist, 0.10, -0.05),
    (JointName::Root, 0.0, 0.0),
    (JointName::LeftHip, -0.05, 0.0),
    (JointName::RightHip, 0.05, 0.0),
    (JointName::LeftKnee, -0.06, 0.14),
    (JointName::RightKnee, 0.06, 0.14),
    (JointName::LeftAnkle, -0.06, 0.26),
    (JointName::RightAnkle, 0.06, 0.26),
];

/// Recovers poses from [`super::SyntheticCamera`] frames: one pose per
/// marker, anchored at the marker as the hip centre. Bright markers get a
/// full-size skeleton, dim ones a smaller skeleton further away.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkerPoseEstimator;

impl MarkerPoseEstimator {
    fn skeleton(x: f32, y: f32, intensity: u8) -> Pose {
        let scale = if intensity >= NEAR_SUBJECT_INTENSITY {
            1.0
        } else {
            0.4
        };
        let confidence = f32::from(intensity) / 255.0;
        SKELETON
            .iter()
            .map(|(name, dx, dy)| {
                Joint::new(
                    *name,
                    (x + dx * scale).clamp(0.0, 1.0),
                    (y + dy * scale).clamp(0.0, 1.0),
                    confidence,
                )
            })
            .collect()
    }
}

#[async_trait]
impl PoseEstimator for MarkerPoseEstimator {
    async fn estimate(&self, frame: &Frame) -> Result<Vec<Pose>, AppError> {
        let luma = frame.image().to_luma8();
        let (width, height) = luma.dimensions();
        if width < 2 || height == 0 {
            return Err(AppError::Estimation(format!(
                "frame {} is too small ({}x{})",
                frame.id(),
                width,
                height
            )));
        }

        let half = width / 2;
        let mut poses = Vec::new();
        for (start, end) in [(0, half), (half, width)] {
            let brightest = luma
                .enumerate_pixels()
                .filter(|(x, _, _)| (start..end).contains(x))
                .max_by_key(|(_, _, pixel)| pixel.0[0]);
            if let Some((x, y, pixel)) = brightest {
                let intensity = pixel.0[0];
                if intensity >= MIN_MARKER_INTENSITY {
                    let nx = (x as f32 + 0.5) / width as f32;
                    let ny = (y as f32 + 0.5) / height as f32;
                    poses.push(Self::skeleton(nx, ny, intensity));
                }
            }
        }
        Ok(poses)
    }
}
