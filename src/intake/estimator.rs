use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use tower::util::BoxService;
use tower::{BoxError, Service, ServiceBuilder, ServiceExt};

use crate::common::Frame;
use crate::error::AppError;
use crate::pipeline::types::Pose;

/// Extracts every human pose visible in a frame. Stateless between calls.
#[async_trait]
pub trait PoseEstimator: Send + Sync {
    async fn estimate(&self, frame: &Frame) -> Result<Vec<Pose>, AppError>;
}

/// Exposes a [`PoseEstimator`] as a tower service so it can be layered.
#[derive(Clone)]
pub struct EstimationService {
    estimator: Arc<dyn PoseEstimator>,
}

impl EstimationService {
    pub fn new(estimator: Arc<dyn PoseEstimator>) -> Self {
        Self { estimator }
    }
}

impl Service<Frame> for EstimationService {
    type Response = Vec<Pose>;
    type Error = AppError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, frame: Frame) -> Self::Future {
        let estimator = self.estimator.clone();
        Box::pin(async move { estimator.estimate(&frame).await })
    }
}

pub type BoxEstimationService = BoxService<Frame, Vec<Pose>, AppError>;

/// Estimation with a per-frame deadline. Every failure, including the
/// deadline, comes out as `AppError::Estimation`.
pub fn estimation_service(
    estimator: Arc<dyn PoseEstimator>,
    timeout: Duration,
) -> BoxEstimationService {
    ServiceBuilder::new()
        .map_err(move |err: BoxError| into_estimation_error(err, timeout))
        .timeout(timeout)
        .service(EstimationService::new(estimator))
        .boxed()
}

fn into_estimation_error(err: BoxError, timeout: Duration) -> AppError {
    if err.is::<tower::timeout::error::Elapsed>() {
        return AppError::Estimation(format!("pose estimation exceeded {:?}", timeout));
    }
    match err.downcast::<AppError>() {
        Ok(err) => match *err {
            AppError::Estimation(message) => AppError::Estimation(message),
            other => AppError::Estimation(other.to_string()),
        },
        Err(err) => AppError::Estimation(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::{Joint, JointName};
    use chrono::Utc;
    use image::{DynamicImage, GrayImage};

    struct FixedEstimator {
        delay: Duration,
        fail: bool,
    }

    #[async_trait]
    impl PoseEstimator for FixedEstimator {
        async fn estimate(&self, frame: &Frame) -> Result<Vec<Pose>, AppError> {
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(AppError::Estimation(format!("frame {} unreadable", frame.id())));
            }
            Ok(vec![
                Pose::new().with_joint(Joint::new(JointName::Neck, 0.5, 0.2, 0.9)),
            ])
        }
    }

    fn frame() -> Frame {
        Frame::new(5, DynamicImage::ImageLuma8(GrayImage::new(4, 4)), Utc::now())
    }

    #[tokio::test]
    async fn returns_estimator_poses() {
        let estimator = Arc::new(FixedEstimator {
            delay: Duration::ZERO,
            fail: false,
        });
        let mut service = estimation_service(estimator, Duration::from_secs(1));
        let poses = service.ready().await.unwrap().call(frame()).await.unwrap();
        assert_eq!(poses.len(), 1);
    }

    #[tokio::test]
    async fn estimator_failure_keeps_its_message() {
        let estimator = Arc::new(FixedEstimator {
            delay: Duration::ZERO,
            fail: true,
        });
        let mut service = estimation_service(estimator, Duration::from_secs(1));
        let err = service.ready().await.unwrap().call(frame()).await.unwrap_err();
        assert_eq!(err.to_string(), "Estimation Error: frame 5 unreadable");
    }

    #[tokio::test]
    async fn slow_estimation_times_out() {
        let estimator = Arc::new(FixedEstimator {
            delay: Duration::from_millis(200),
            fail: false,
        });
        let mut service = estimation_service(estimator, Duration::from_millis(10));
        let err = service.ready().await.unwrap().call(frame()).await.unwrap_err();
        assert!(matches!(err, AppError::Estimation(message) if message.contains("exceeded")));
    }
}
