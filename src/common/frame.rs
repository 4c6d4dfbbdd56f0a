use chrono::{DateTime, Utc};
use image::DynamicImage;
use std::sync::Arc;

use crate::pipeline::types::{Pose, PoseSet, TemporalFeature};

/// One camera tick. The image is shared, so cloning a frame to fan it out
/// never copies pixels.
#[derive(Debug, Clone)]
pub struct Frame {
    id: u64,
    image: Arc<DynamicImage>,
    captured_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(id: u64, image: DynamicImage, captured_at: DateTime<Utc>) -> Self {
        Self {
            id,
            image: Arc::new(image),
            captured_at,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}

/// A frame together with every pose the estimator found in it. This is the
/// item the stream router hands to the display and counting consumers.
#[derive(Debug, Clone)]
pub struct PoseFrame {
    pub frame: Frame,
    pub poses: Vec<Pose>,
}

impl PoseFrame {
    pub fn new(frame: Frame, poses: Vec<Pose>) -> Self {
        Self { frame, poses }
    }

    /// Drops the image, keeping only what the counting pipeline consumes.
    pub fn into_pose_set(self) -> PoseSet {
        TemporalFeature::new(self.frame.id, self.frame.captured_at, self.poses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn frame(id: u64) -> Frame {
        let img: DynamicImage = DynamicImage::ImageRgb8(
            ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(16, 16, Rgb([1, 2, 3])),
        );
        Frame::new(id, img, Utc::now())
    }

    #[test]
    fn cloning_frame_shares_image_buffer() {
        let f1 = frame(1);
        let f2 = f1.clone();
        assert!(Arc::ptr_eq(&f1.image, &f2.image));
    }

    #[test]
    fn pose_set_keeps_frame_ordering_key() {
        let f = frame(42);
        let captured_at = f.captured_at();
        let set = PoseFrame::new(f, vec![Pose::new(), Pose::new()]).into_pose_set();
        assert_eq!(set.id, 42);
        assert_eq!(set.captured_at, captured_at);
        assert_eq!(set.feature.len(), 2);
    }
}
