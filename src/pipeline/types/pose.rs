use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Minimum confidence for a joint to count as detected.
pub const CONFIDENCE_THRESHOLD: f32 = 0.3;

/// Typical area of a dominant subject, in normalized image units.
const TYPICAL_LARGE_POSE_AREA: f32 = 0.35;

/// Anatomical landmarks produced by the body pose extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointName {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    Neck,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    Root,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl JointName {
    pub const ALL: [JointName; 19] = [
        Self::Nose,
        Self::LeftEye,
        Self::RightEye,
        Self::LeftEar,
        Self::RightEar,
        Self::Neck,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::Root,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
    ];
}

/// A single keypoint in normalized image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Joint {
    pub name: JointName,
    /// Normalized X coordinate (0.0..=1.0)
    pub x: f32,
    /// Normalized Y coordinate (0.0..=1.0)
    pub y: f32,
    /// Detection confidence (0.0..=1.0)
    pub confidence: f32,
}

impl Joint {
    pub fn new(name: JointName, x: f32, y: f32, confidence: f32) -> Self {
        Self {
            name,
            x,
            y,
            confidence,
        }
    }

    pub fn is_valid(&self, threshold: f32) -> bool {
        self.confidence >= threshold
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl BoundingBox {
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }
}

/// One detected subject in one frame. Joint names are unique and keep
/// insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pose {
    keypoints: IndexMap<JointName, Joint>,
}

impl Pose {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a joint, replacing any previous joint with the same name.
    pub fn insert(&mut self, joint: Joint) {
        self.keypoints.insert(joint.name, joint);
    }

    pub fn with_joint(mut self, joint: Joint) -> Self {
        self.insert(joint);
        self
    }

    pub fn get(&self, name: JointName) -> Option<&Joint> {
        self.keypoints.get(&name)
    }

    pub fn joints(&self) -> impl Iterator<Item = &Joint> {
        self.keypoints.values()
    }

    pub fn joint_names(&self) -> impl Iterator<Item = JointName> + '_ {
        self.keypoints.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    /// A pose is drawable when at least one joint clears the threshold.
    pub fn is_drawable(&self, threshold: f32) -> bool {
        self.joints().any(|joint| joint.is_valid(threshold))
    }

    /// Axis-aligned box enclosing every joint at or above `threshold`.
    pub fn bounding_box(&self, threshold: f32) -> Option<BoundingBox> {
        let mut valid = self.joints().filter(|joint| joint.is_valid(threshold));
        let first = valid.next()?;
        let init = BoundingBox {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        Some(valid.fold(init, |bbox, joint| BoundingBox {
            min_x: bbox.min_x.min(joint.x),
            min_y: bbox.min_y.min(joint.y),
            max_x: bbox.max_x.max(joint.x),
            max_y: bbox.max_y.max(joint.y),
        }))
    }

    pub fn bounding_box_area(&self, threshold: f32) -> f32 {
        self.bounding_box(threshold)
            .map(|bbox| bbox.area())
            .unwrap_or(0.0)
    }

    /// Wireframe scale for renderers: dominant subjects draw at full size,
    /// small ones shrink down to 60%, then everything is halved.
    pub fn drawing_scale(&self, threshold: f32) -> f32 {
        let max = 1.0;
        let min = 0.6;
        let ratio = self.bounding_box_area(threshold) / TYPICAL_LARGE_POSE_AREA;
        let scale = if ratio >= max {
            max
        } else {
            ratio * (max - min) + min
        };
        scale * 0.5
    }
}

impl FromIterator<Joint> for Pose {
    fn from_iter<I: IntoIterator<Item = Joint>>(iter: I) -> Self {
        let mut pose = Pose::new();
        for joint in iter {
            pose.insert(joint);
        }
        pose
    }
}
