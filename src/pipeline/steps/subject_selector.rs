use crate::pipeline::transformer::Transformer;
use crate::pipeline::types::{Pose, PoseSet, TemporalFeature};

/// Picks the dominant subject of a frame: the pose with the largest
/// bounding box over its confident joints. Ties go to the pose seen first.
/// Frames without poses are dropped.
pub struct SubjectSelector {
    confidence_threshold: f32,
}

impl SubjectSelector {
    pub fn new(confidence_threshold: f32) -> Self {
        Self {
            confidence_threshold,
        }
    }

    fn select(&self, poses: Vec<Pose>) -> Option<Pose> {
        let mut best: Option<(f32, Pose)> = None;
        for pose in poses {
            let area = pose.bounding_box_area(self.confidence_threshold);
            match &best {
                Some((best_area, _)) if area <= *best_area => {}
                _ => best = Some((area, pose)),
            }
        }
        best.map(|(_, pose)| pose)
    }
}

impl Transformer for SubjectSelector {
    type Input = PoseSet;
    type Output = TemporalFeature<Pose>;

    fn apply(&mut self, input: PoseSet) -> Option<TemporalFeature<Pose>> {
        let TemporalFeature {
            id,
            captured_at,
            feature: poses,
        } = input;
        if poses.len() > 1 {
            tracing::trace!("Frame {} had {} poses, keeping the largest", id, poses.len());
        }
        let pose = self.select(poses)?;
        Some(TemporalFeature {
            id,
            captured_at,
            feature: pose,
        })
    }

    fn name(&self) -> &'static str {
        "subject_selector"
    }
}
