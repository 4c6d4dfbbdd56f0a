use std::f32::consts::TAU;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;
use image::{DynamicImage, GrayImage, Luma, imageops};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::IntervalStream;

use crate::common::Frame;
use crate::config::{CameraConfiguration, CameraPosition, PixelFormat, SimulationConfiguration};
use crate::error::AppError;
use crate::intake::{FrameSource, FrameStream};

/// Brightness of the marker that stands for the counted subject's hips.
pub const SUBJECT_INTENSITY: u8 = 255;
/// Brightness of the background bystander's marker.
pub const BYSTANDER_INTENSITY: u8 = 120;

/// Normalized hip height when standing and at the bottom of a squat.
const STANDING_HIP_Y: f32 = 0.45;
const SQUAT_DEPTH: f32 = 0.25;

/// Renders a person squatting at a steady pace, seen by a fixed camera.
///
/// Each frame is black except for one bright pixel at the subject's hip and,
/// optionally, a dimmer one for a bystander swaying on the other side.
/// The back camera sees the scene mirrored.
#[derive(Debug, Clone)]
pub struct SyntheticCamera {
    settings: SimulationConfiguration,
}

impl SyntheticCamera {
    pub fn new(settings: SimulationConfiguration) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl FrameSource for SyntheticCamera {
    async fn open(&self, camera: &CameraConfiguration) -> Result<FrameStream, AppError> {
        if self.settings.fps == 0 || self.settings.frames_per_repetition == 0 {
            return Err(AppError::Acquisition(
                "synthetic camera needs a non-zero frame rate".to_string(),
            ));
        }
        let mut scene = SquatScene::new(&self.settings, *camera);
        let mut interval = tokio::time::interval(Duration::from_secs_f64(
            1.0 / f64::from(self.settings.fps),
        ));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let limit = self
            .settings
            .frame_limit
            .map(|limit| usize::try_from(limit).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);

        Ok(IntervalStream::new(interval)
            .take(limit)
            .map(move |_| Ok(scene.next_frame()))
            .boxed())
    }
}

pub(crate) struct SquatScene {
    camera: CameraConfiguration,
    frames_per_repetition: u32,
    bystander: bool,
    rng: StdRng,
    next_id: u64,
}

impl SquatScene {
    pub(crate) fn new(settings: &SimulationConfiguration, camera: CameraConfiguration) -> Self {
        Self {
            camera,
            frames_per_repetition: settings.frames_per_repetition,
            bystander: settings.bystander,
            rng: StdRng::seed_from_u64(settings.seed),
            next_id: 0,
        }
    }

    /// Subject hip height for frame `id`: standing at the start of every
    /// cycle, deepest half way through.
    pub(crate) fn hip_y(&self, id: u64) -> f32 {
        let phase = (id % u64::from(self.frames_per_repetition)) as f32
            / self.frames_per_repetition as f32;
        let depth = 0.5 - 0.5 * (TAU * phase).cos();
        STANDING_HIP_Y + SQUAT_DEPTH * depth
    }

    pub(crate) fn next_frame(&mut self) -> Frame {
        let id = self.next_id;
        self.next_id += 1;

        let (width, height) = self.camera.resolution.dimensions();
        let mut image = GrayImage::new(width, height);
        let jitter: i64 = self.rng.random_range(-1..=1);
        let subject_row = to_pixel(self.hip_y(id), height) as i64 + jitter;
        image.put_pixel(
            width / 4,
            subject_row.clamp(0, i64::from(height) - 1) as u32,
            Luma([SUBJECT_INTENSITY]),
        );
        if self.bystander {
            let sway = 0.03 * (TAU * id as f32 / 97.0).sin();
            image.put_pixel(
                width * 3 / 4,
                to_pixel(0.5 + sway, height),
                Luma([BYSTANDER_INTENSITY]),
            );
        }
        if self.camera.position == CameraPosition::Back {
            imageops::flip_horizontal_in_place(&mut image);
        }

        let image = match self.camera.pixel_format {
            PixelFormat::Luma8 => DynamicImage::ImageLuma8(image),
            PixelFormat::Rgb24 => {
                DynamicImage::ImageRgb8(DynamicImage::ImageLuma8(image).to_rgb8())
            }
            PixelFormat::Bgra32 => {
                DynamicImage::ImageRgba8(DynamicImage::ImageLuma8(image).to_rgba8())
            }
        };
        Frame::new(id, image, Utc::now())
    }
}

fn to_pixel(normalized: f32, extent: u32) -> u32 {
    let pixel = (normalized * extent as f32) as u32;
    pixel.min(extent.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Resolution;

    fn settings(frame_limit: Option<u64>) -> SimulationConfiguration {
        SimulationConfiguration {
            fps: 500,
            frames_per_repetition: 20,
            bystander: true,
            seed: 1,
            frame_limit,
        }
    }

    #[test]
    fn hip_moves_from_standing_to_bottom_and_back() {
        let scene = SquatScene::new(&settings(None), CameraConfiguration::default());
        assert!((scene.hip_y(0) - STANDING_HIP_Y).abs() < 1e-6);
        assert!((scene.hip_y(10) - (STANDING_HIP_Y + SQUAT_DEPTH)).abs() < 1e-6);
        assert!((scene.hip_y(20) - STANDING_HIP_Y).abs() < 1e-6);
    }

    #[test]
    fn frames_follow_the_configured_format() {
        let camera = CameraConfiguration {
            position: CameraPosition::Front,
            pixel_format: PixelFormat::Rgb24,
            resolution: Resolution::Low,
        };
        let mut scene = SquatScene::new(&settings(None), camera);
        let frame = scene.next_frame();
        assert_eq!(frame.id(), 0);
        assert!(matches!(frame.image(), DynamicImage::ImageRgb8(_)));
        assert_eq!((frame.image().width(), frame.image().height()), (32, 24));
        assert_eq!(scene.next_frame().id(), 1);
    }

    #[test]
    fn back_camera_mirrors_the_scene() {
        let mut camera = CameraConfiguration {
            pixel_format: PixelFormat::Luma8,
            ..CameraConfiguration::default()
        };
        let front = SquatScene::new(&settings(None), camera).next_frame();
        camera.position = CameraPosition::Back;
        let back = SquatScene::new(&settings(None), camera).next_frame();

        let brightest_column = |frame: &Frame| {
            let luma = frame.image().to_luma8();
            luma.enumerate_pixels()
                .max_by_key(|(_, _, pixel)| pixel.0[0])
                .map(|(x, _, _)| x)
                .unwrap()
        };
        let width = front.image().width();
        assert_eq!(brightest_column(&front), width / 4);
        assert_eq!(brightest_column(&back), width - 1 - width / 4);
    }

    #[tokio::test]
    async fn stream_stops_at_frame_limit() {
        let camera = SyntheticCamera::new(settings(Some(6)));
        let frames: Vec<_> = camera
            .open(&CameraConfiguration::default())
            .await
            .unwrap()
            .collect()
            .await;
        let ids: Vec<u64> = frames.into_iter().map(|frame| frame.unwrap().id()).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4, 5]);
    }
}
