use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::common::Frame;
use crate::config::CameraConfiguration;
use crate::error::AppError;

/// Live, non-restartable sequence of camera frames.
pub type FrameStream = BoxStream<'static, Result<Frame, AppError>>;

/// Opens a camera. Every call starts a fresh sequence; restarting the camera
/// means calling `open` again.
#[async_trait]
pub trait FrameSource: Send + Sync {
    async fn open(&self, camera: &CameraConfiguration) -> Result<FrameStream, AppError>;
}
