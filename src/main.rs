use std::path::PathBuf;
use std::str::FromStr;

use repcount::simulation::{HipDepthModel, MarkerPoseEstimator, SyntheticCamera, TracingRenderer};
use repcount::{AppError, Configuration, CoordinatorBuilder};
use tracing::Level;

fn init_logging(level: Level) {
    tracing_subscriber::fmt().with_max_level(level).init();
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let path = std::env::args().nth(1).map(PathBuf::from);
    let configuration = Configuration::load(path.as_deref())?;
    let level = Level::from_str(&configuration.log_level).map_err(|_| {
        AppError::InvalidConfig(format!("unknown log_level {}", configuration.log_level))
    })?;
    init_logging(level);

    let mut coordinator = CoordinatorBuilder::new(configuration.clone())
        .frame_source(SyntheticCamera::new(configuration.simulation.clone()))
        .pose_estimator(MarkerPoseEstimator)
        .render_target(TracingRenderer)
        .model(HipDepthModel::default())
        .build()?;
    coordinator.start()?;

    let mut counts = coordinator.subscribe_count();
    let mut status = coordinator.subscribe_status();
    let mut last_shown = 0;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = counts.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = *counts.borrow_and_update();
                let shown = snapshot.display_count.floor() as u64;
                if shown != last_shown {
                    tracing::info!("Repetitions: {}", shown);
                    last_shown = shown;
                }
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = status.borrow_and_update().clone();
                tracing::info!("Pipeline status: {:?}", current);
            }
        }
    }

    tracing::info!("Shutting down");
    coordinator.shutdown().await
}
