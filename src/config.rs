use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::pipeline::reconciler::DEFAULT_STALL_EPSILON;
use crate::pipeline::types::{CONFIDENCE_THRESHOLD, JointName};

const ENV_PREFIX: &str = "REPCOUNT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraPosition {
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    Bgra32,
    Rgb24,
    Luma8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Low,
    Medium,
    High,
}

impl Resolution {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Resolution::Low => (32, 24),
            Resolution::Medium => (64, 48),
            Resolution::High => (128, 96),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraConfiguration {
    pub position: CameraPosition,
    pub pixel_format: PixelFormat,
    pub resolution: Resolution,
}

impl Default for CameraConfiguration {
    fn default() -> Self {
        Self {
            position: CameraPosition::Front,
            pixel_format: PixelFormat::Bgra32,
            resolution: Resolution::High,
        }
    }
}

impl CameraConfiguration {
    /// Same format and resolution, other camera.
    pub fn toggled(&self) -> Self {
        let position = match self.position {
            CameraPosition::Front => CameraPosition::Back,
            CameraPosition::Back => CameraPosition::Front,
        };
        Self { position, ..*self }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfiguration {
    pub downsample_factor: usize,
    pub confidence_threshold: f32,
    pub selected_joints: Vec<JointName>,
    pub window_length: usize,
    pub window_stride: usize,
    pub stall_epsilon: f32,
}

impl Default for PipelineConfiguration {
    fn default() -> Self {
        Self {
            downsample_factor: 3,
            confidence_threshold: CONFIDENCE_THRESHOLD,
            selected_joints: vec![
                JointName::Neck,
                JointName::RightShoulder,
                JointName::LeftShoulder,
                JointName::LeftHip,
                JointName::RightHip,
                JointName::LeftKnee,
                JointName::RightKnee,
            ],
            window_length: 90,
            window_stride: 5,
            stall_epsilon: DEFAULT_STALL_EPSILON,
        }
    }
}

impl PipelineConfiguration {
    pub fn downsample_factor(&self) -> Result<NonZeroUsize, AppError> {
        non_zero("downsample_factor", self.downsample_factor)
    }

    pub fn window_length(&self) -> Result<NonZeroUsize, AppError> {
        non_zero("window_length", self.window_length)
    }

    pub fn window_stride(&self) -> Result<NonZeroUsize, AppError> {
        non_zero("window_stride", self.window_stride)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        self.downsample_factor()?;
        let length = self.window_length()?;
        let stride = self.window_stride()?;
        if stride > length {
            return Err(AppError::InvalidConfig(format!(
                "window_stride ({}) must not exceed window_length ({})",
                stride, length
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(AppError::InvalidConfig(format!(
                "confidence_threshold must be within [0, 1], got {}",
                self.confidence_threshold
            )));
        }
        if self.selected_joints.is_empty() {
            return Err(AppError::InvalidConfig(
                "selected_joints must name at least one joint".to_string(),
            ));
        }
        if self.stall_epsilon < 0.0 {
            return Err(AppError::InvalidConfig(format!(
                "stall_epsilon must not be negative, got {}",
                self.stall_epsilon
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfiguration {
    pub display_buffer_size: usize,
    pub counting_buffer_size: usize,
}

impl Default for ChannelConfiguration {
    fn default() -> Self {
        Self {
            display_buffer_size: 8,
            counting_buffer_size: 64,
        }
    }
}

/// Settings for the bundled synthetic camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfiguration {
    pub fps: u32,
    pub frames_per_repetition: u32,
    pub bystander: bool,
    pub seed: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_limit: Option<u64>,
}

impl Default for SimulationConfiguration {
    fn default() -> Self {
        Self {
            fps: 30,
            frames_per_repetition: 60,
            bystander: true,
            seed: 42,
            frame_limit: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub camera: CameraConfiguration,
    pub pipeline: PipelineConfiguration,
    pub channels: ChannelConfiguration,
    pub estimation_timeout_ms: u64,
    pub reset_counting_on_toggle: bool,
    pub log_level: String,
    pub simulation: SimulationConfiguration,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            camera: CameraConfiguration::default(),
            pipeline: PipelineConfiguration::default(),
            channels: ChannelConfiguration::default(),
            estimation_timeout_ms: 500,
            reset_counting_on_toggle: true,
            log_level: "info".to_string(),
            simulation: SimulationConfiguration::default(),
        }
    }
}

impl Configuration {
    /// Defaults, then the optional file, then `REPCOUNT__*` environment
    /// variables (e.g. `REPCOUNT__PIPELINE__WINDOW_STRIDE=10`).
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let mut builder =
            Config::builder().add_source(Config::try_from(&Configuration::default())?);
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        let configuration: Configuration = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        configuration.validate()?;
        Ok(configuration)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        self.pipeline.validate()?;
        if self.channels.display_buffer_size == 0 || self.channels.counting_buffer_size == 0 {
            return Err(AppError::InvalidConfig(
                "channel buffer sizes must be at least 1".to_string(),
            ));
        }
        if self.estimation_timeout_ms == 0 {
            return Err(AppError::InvalidConfig(
                "estimation_timeout_ms must be at least 1".to_string(),
            ));
        }
        if self.simulation.fps == 0 || self.simulation.frames_per_repetition == 0 {
            return Err(AppError::InvalidConfig(
                "simulation fps and frames_per_repetition must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn estimation_timeout(&self) -> Duration {
        Duration::from_millis(self.estimation_timeout_ms)
    }
}

fn non_zero(field: &str, value: usize) -> Result<NonZeroUsize, AppError> {
    NonZeroUsize::new(value)
        .ok_or_else(|| AppError::InvalidConfig(format!("{} must be at least 1", field)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_squat_counter_setup() {
        let configuration = Configuration::default();
        assert!(configuration.validate().is_ok());
        assert_eq!(configuration.pipeline.downsample_factor, 3);
        assert_eq!(configuration.pipeline.window_length, 90);
        assert_eq!(configuration.pipeline.window_stride, 5);
        assert_eq!(configuration.pipeline.selected_joints.len(), 7);
        assert_eq!(configuration.camera.position, CameraPosition::Front);
    }

    #[test]
    fn toggling_flips_position_only() {
        let camera = CameraConfiguration::default();
        let toggled = camera.toggled();
        assert_eq!(toggled.position, CameraPosition::Back);
        assert_eq!(toggled.pixel_format, camera.pixel_format);
        assert_eq!(toggled.resolution, camera.resolution);
        assert_eq!(toggled.toggled(), camera);
    }

    #[test]
    fn rejects_stride_longer_than_window() {
        let mut configuration = Configuration::default();
        configuration.pipeline.window_stride = 91;
        assert!(matches!(
            configuration.validate(),
            Err(AppError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_zero_factor_and_empty_selection() {
        let mut configuration = Configuration::default();
        configuration.pipeline.downsample_factor = 0;
        assert!(configuration.validate().is_err());

        let mut configuration = Configuration::default();
        configuration.pipeline.selected_joints.clear();
        assert!(configuration.validate().is_err());
    }

    #[test]
    fn file_overrides_defaults() {
        let path = std::env::temp_dir().join(format!("repcount-{}.toml", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "reset_counting_on_toggle = false\n[pipeline]\nwindow_length = 30\nwindow_stride = 3"
        )
        .unwrap();
        let configuration = Configuration::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(!configuration.reset_counting_on_toggle);
        assert_eq!(configuration.pipeline.window_length, 30);
        assert_eq!(configuration.pipeline.window_stride, 3);
        assert_eq!(configuration.pipeline.selected_joints.len(), 7);
        assert_eq!(configuration.pipeline.downsample_factor, 3);
    }
}
