use crate::pipeline::transformer::Transformer;
use crate::pipeline::types::{JointName, Pose, TemporalFeature};

/// Restricts each pose to a fixed, ordered set of joints.
///
/// Output joints follow the selection order, not the input order. Joints that
/// are not selected are discarded whatever their confidence; selected joints
/// missing from the input are simply absent.
pub struct FeatureSelector {
    selected: Vec<JointName>,
}

impl FeatureSelector {
    pub fn new(selected: impl IntoIterator<Item = JointName>) -> Self {
        let mut joints: Vec<JointName> = Vec::new();
        for joint in selected {
            if !joints.contains(&joint) {
                joints.push(joint);
            }
        }
        Self { selected: joints }
    }

    pub fn selected(&self) -> &[JointName] {
        &self.selected
    }
}

impl Transformer for FeatureSelector {
    type Input = TemporalFeature<Pose>;
    type Output = TemporalFeature<Pose>;

    fn apply(&mut self, input: TemporalFeature<Pose>) -> Option<TemporalFeature<Pose>> {
        Some(input.map(|pose| {
            self.selected
                .iter()
                .filter_map(|name| pose.get(*name).copied())
                .collect()
        }))
    }

    fn name(&self) -> &'static str {
        "feature_selector"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::Joint;
    use chrono::Utc;

    fn full_pose() -> Pose {
        JointName::ALL
            .iter()
            .enumerate()
            .map(|(i, name)| Joint::new(*name, i as f32 / 20.0, 0.5, 0.9))
            .collect()
    }

    #[test]
    fn keeps_only_selected_joints_in_selection_order() {
        let mut selector = FeatureSelector::new([
            JointName::RightKnee,
            JointName::Neck,
            JointName::LeftHip,
        ]);
        let out = selector
            .apply(TemporalFeature::new(3, Utc::now(), full_pose()))
            .unwrap();
        let names: Vec<_> = out.feature.joint_names().collect();
        assert_eq!(
            names,
            vec![JointName::RightKnee, JointName::Neck, JointName::LeftHip]
        );
        assert_eq!(out.id, 3);
    }

    #[test]
    fn low_confidence_selected_joints_are_kept() {
        let pose = Pose::new()
            .with_joint(Joint::new(JointName::Neck, 0.5, 0.2, 0.01))
            .with_joint(Joint::new(JointName::Nose, 0.5, 0.1, 0.99));
        let mut selector = FeatureSelector::new([JointName::Neck]);
        let out = selector
            .apply(TemporalFeature::new(0, Utc::now(), pose))
            .unwrap();
        assert_eq!(out.feature.len(), 1);
        assert!(out.feature.get(JointName::Nose).is_none());
    }

    #[test]
    fn pose_without_selected_joints_becomes_empty() {
        let pose = Pose::new().with_joint(Joint::new(JointName::LeftWrist, 0.1, 0.1, 0.9));
        let mut selector = FeatureSelector::new([JointName::Neck, JointName::LeftKnee]);
        let out = selector
            .apply(TemporalFeature::new(0, Utc::now(), pose))
            .unwrap();
        assert!(out.feature.is_empty());
    }

    #[test]
    fn duplicate_selections_are_collapsed() {
        let selector = FeatureSelector::new([JointName::Neck, JointName::Neck, JointName::Root]);
        assert_eq!(selector.selected(), &[JointName::Neck, JointName::Root]);
    }
}
