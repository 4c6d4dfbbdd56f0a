use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use futures::StreamExt;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower::{Service, ServiceExt};
use tracing::Instrument;
use uuid::Uuid;

use crate::app::{CountSnapshot, PipelineStatus, RenderTarget, ViewState};
use crate::common::{Frame, PoseFrame};
use crate::config::{CameraConfiguration, Configuration};
use crate::error::AppError;
use crate::intake::{BoxEstimationService, FrameSource, PoseEstimator, estimation_service};
use crate::pipeline::types::Pose;
use crate::pipeline::{
    CountReconciler, CountingPipeline, OverflowPolicy, RepetitionModel, StreamRouter,
};

const CONTROL_BUFFER_SIZE: usize = 8;

/// Requests handled inside the counting task, so the counter keeps a single
/// writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountingCommand {
    /// Zero the visible counter without starting a new session.
    ClearDisplay,
}

/// Everything the counting task owns that must survive a session restart.
struct CountingParts {
    model: Box<dyn RepetitionModel>,
    pose_rx: Receiver<PoseFrame>,
    control_rx: Receiver<CountingCommand>,
}

struct TaskHandle<T> {
    task: JoinHandle<T>,
    cancel_token: CancellationToken,
}

/// Owns the display task (acquisition, estimation, fan-out, rendering) and
/// the counting task (pipeline and reconciler), and implements the control
/// surface: start, camera toggle, session reset, restart after failure.
pub struct Coordinator {
    configuration: Configuration,
    camera: CameraConfiguration,
    source: Arc<dyn FrameSource>,
    estimator: Arc<dyn PoseEstimator>,
    renderer: Arc<dyn RenderTarget>,
    view: Arc<ViewState>,
    pose_tx: Sender<PoseFrame>,
    control_tx: Sender<CountingCommand>,
    idle_counting: Option<CountingParts>,
    counting_failed: Arc<AtomicBool>,
    display_task: Option<TaskHandle<Result<(), AppError>>>,
    counting_task: Option<TaskHandle<CountingParts>>,
}

impl Coordinator {
    /// Starts the display task, replacing any running one, and the counting
    /// task if it is not already running.
    pub fn start(&mut self) -> Result<(), AppError> {
        self.start_display_task();
        if self.counting_task.is_none() {
            self.start_counting_task()?;
        }
        Ok(())
    }

    /// Switches cameras and clears the visible counter. With
    /// `reset_counting_on_toggle` the whole counting session is restarted;
    /// otherwise only the display value is zeroed.
    pub async fn toggle_camera(&mut self) -> Result<(), AppError> {
        self.camera = self.camera.toggled();
        tracing::info!("Switching to {:?} camera", self.camera.position);
        self.stop_display().await;
        if self.configuration.reset_counting_on_toggle {
            self.reset_session().await?;
        } else {
            self.control_tx
                .send(CountingCommand::ClearDisplay)
                .await
                .map_err(|_| AppError::Pipeline("counting control channel closed".to_string()))?;
        }
        self.start_display_task();
        Ok(())
    }

    /// Tears the counting session down and starts a fresh one: new windower,
    /// reset model, zeroed reconciler. Pose frames queued for the old session
    /// are discarded.
    pub async fn reset_session(&mut self) -> Result<(), AppError> {
        self.stop_counting().await?;
        if let Some(parts) = self.idle_counting.as_mut() {
            let mut discarded = 0;
            while parts.pose_rx.try_recv().is_ok() {
                discarded += 1;
            }
            while parts.control_rx.try_recv().is_ok() {}
            if discarded > 0 {
                tracing::debug!("Discarded {} pose frames from the previous session", discarded);
            }
        }
        self.start_counting_task()
    }

    /// Recovery after a failure. The display task is always restarted; the
    /// counting session only if it has failed or ended.
    pub async fn restart(&mut self) -> Result<(), AppError> {
        self.stop_display().await;
        let counting_ended = self.counting_failed.load(Ordering::SeqCst)
            || self
                .counting_task
                .as_ref()
                .map_or(true, |counting| counting.task.is_finished());
        if counting_ended {
            self.reset_session().await?;
        }
        self.start_display_task();
        Ok(())
    }

    pub async fn shutdown(mut self) -> Result<(), AppError> {
        self.stop_display().await;
        let result = self.stop_counting().await;
        self.view.set_status(PipelineStatus::Stopped);
        result
    }

    pub fn camera(&self) -> CameraConfiguration {
        self.camera
    }

    pub fn view(&self) -> Arc<ViewState> {
        self.view.clone()
    }

    pub fn subscribe_count(&self) -> watch::Receiver<CountSnapshot> {
        self.view.subscribe_count()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<PipelineStatus> {
        self.view.subscribe_status()
    }

    fn start_display_task(&mut self) {
        if let Some(previous) = self.display_task.take() {
            previous.cancel_token.cancel();
        }

        let mut router = StreamRouter::new();
        router.add_route("counting", self.pose_tx.clone(), OverflowPolicy::Block);
        let display_rx = router.subscribe(
            "display",
            self.configuration.channels.display_buffer_size,
            OverflowPolicy::DropNewest,
        );
        let estimation = estimation_service(
            self.estimator.clone(),
            self.configuration.estimation_timeout(),
        );

        let cancel_token = CancellationToken::new();
        let camera = self.camera;
        let source = self.source.clone();
        let renderer = self.renderer.clone();
        let view = self.view.clone();
        let token = cancel_token.clone();
        let span = tracing::info_span!("display", camera = ?camera.position);

        let task = tokio::spawn(
            async move {
                view.set_status(PipelineStatus::Running(camera.position));
                let acquisition = acquire(camera, source, estimation, router, token.clone());
                let rendering = render(display_rx, renderer);
                let (result, rendered) = tokio::join!(acquisition, rendering);
                tracing::debug!("Display task rendered {} frames", rendered);
                if !token.is_cancelled() {
                    match &result {
                        Ok(()) => view.set_status(PipelineStatus::Stopped),
                        Err(e) => {
                            tracing::error!("Display task failed: {}", e);
                            view.set_status(PipelineStatus::Failed(e.to_string()));
                        }
                    }
                }
                result
            }
            .instrument(span),
        );

        self.display_task = Some(TaskHandle { task, cancel_token });
    }

    async fn stop_display(&mut self) {
        let Some(display) = self.display_task.take() else {
            return;
        };
        display.cancel_token.cancel();
        match display.task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!("Stopped display task had failed: {}", e),
            Err(e) => tracing::error!("Display task panicked: {}", e),
        }
    }

    fn start_counting_task(&mut self) -> Result<(), AppError> {
        let parts = self
            .idle_counting
            .take()
            .ok_or_else(|| AppError::Pipeline("counting session state was lost".to_string()))?;
        let session = CountingSession {
            id: Uuid::new_v4(),
            pipeline: CountingPipeline::new(&self.configuration.pipeline, parts.model)?,
            reconciler: CountReconciler::new(self.configuration.pipeline.stall_epsilon),
            view: self.view.clone(),
            last_count_at: None,
        };
        self.counting_failed = Arc::new(AtomicBool::new(false));

        let cancel_token = CancellationToken::new();
        let span = tracing::info_span!("counting", session = %session.id);
        let task = tokio::spawn(
            run_counting(
                session,
                parts.pose_rx,
                parts.control_rx,
                self.counting_failed.clone(),
                cancel_token.clone(),
            )
            .instrument(span),
        );

        self.counting_task = Some(TaskHandle { task, cancel_token });
        Ok(())
    }

    async fn stop_counting(&mut self) -> Result<(), AppError> {
        let Some(counting) = self.counting_task.take() else {
            return Ok(());
        };
        counting.cancel_token.cancel();
        let parts = counting.task.await?;
        self.idle_counting = Some(parts);
        Ok(())
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        if let Some(display) = &self.display_task {
            display.cancel_token.cancel();
        }
        if let Some(counting) = &self.counting_task {
            counting.cancel_token.cancel();
        }
    }
}

async fn acquire(
    camera: CameraConfiguration,
    source: Arc<dyn FrameSource>,
    mut estimation: BoxEstimationService,
    mut router: StreamRouter<PoseFrame>,
    cancel_token: CancellationToken,
) -> Result<(), AppError> {
    let mut frames = tokio::select! {
        _ = cancel_token.cancelled() => return Ok(()),
        frames = source.open(&camera) => frames?,
    };
    tracing::info!(
        "Camera opened: {:?}, {:?}, {:?}",
        camera.position,
        camera.pixel_format,
        camera.resolution
    );

    let mut last_frame_at: Option<Instant> = None;
    loop {
        let frame = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => return Ok(()),
            frame = frames.next() => match frame {
                Some(frame) => frame?,
                None => {
                    tracing::info!("Camera stream ended");
                    return Ok(());
                }
            },
        };

        let poses = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => return Ok(()),
            poses = estimate(&mut estimation, frame.clone()) => poses?,
        };

        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => return Ok(()),
            _ = router.broadcast(PoseFrame::new(frame, poses)) => {}
        }

        let now = Instant::now();
        if let Some(previous) = last_frame_at {
            let elapsed = now.duration_since(previous).as_secs_f32();
            if elapsed > 0.0 {
                tracing::trace!("Frame rate {:.2} fps", 1.0 / elapsed);
            }
        }
        last_frame_at = Some(now);
    }
}

async fn estimate(
    estimation: &mut BoxEstimationService,
    frame: Frame,
) -> Result<Vec<Pose>, AppError> {
    estimation.ready().await?.call(frame).await
}

async fn render(mut display_rx: Receiver<PoseFrame>, renderer: Arc<dyn RenderTarget>) -> u64 {
    let mut rendered = 0;
    while let Some(pose_frame) = display_rx.recv().await {
        renderer.display(&pose_frame.frame, &pose_frame.poses);
        rendered += 1;
    }
    rendered
}

/// State of one counting session, owned by the counting task.
struct CountingSession {
    id: Uuid,
    pipeline: CountingPipeline,
    reconciler: CountReconciler,
    view: Arc<ViewState>,
    last_count_at: Option<Instant>,
}

impl CountingSession {
    async fn count(&mut self, pose_frame: PoseFrame) -> Result<(), AppError> {
        let Some(count) = self.pipeline.process(pose_frame.into_pose_set()).await? else {
            return Ok(());
        };
        let reconciled = self.reconciler.reconcile(&count);
        self.view
            .publish_reconciled(self.id, &reconciled, self.pipeline.windows());

        let now = Instant::now();
        if let Some(previous) = self.last_count_at {
            let elapsed = now.duration_since(previous).as_secs_f32();
            if elapsed > 0.0 {
                tracing::trace!("Count rate {:.2} fps", 1.0 / elapsed);
            }
        }
        self.last_count_at = Some(now);
        Ok(())
    }

    fn clear_display(&mut self) {
        self.reconciler.clear_display();
        self.view.publish_count(CountSnapshot {
            session: self.id,
            display_count: self.reconciler.display_count(),
            last_cumulative: self.reconciler.last_cumulative(),
            windows: self.pipeline.windows(),
        });
    }
}

async fn run_counting(
    mut session: CountingSession,
    mut pose_rx: Receiver<PoseFrame>,
    mut control_rx: Receiver<CountingCommand>,
    failed: Arc<AtomicBool>,
    cancel_token: CancellationToken,
) -> CountingParts {
    tracing::info!("Counting session started");
    session.view.publish_count(CountSnapshot::zero(session.id));

    let counted =
        count_until_cancelled(&mut session, &mut pose_rx, &mut control_rx, &cancel_token).await;
    if let Err(e) = counted {
        tracing::error!("Counting failed: {}", e);
        failed.store(true, Ordering::SeqCst);
        session.view.set_status(PipelineStatus::Failed(e.to_string()));
        // Keep the counting route moving so acquisition and display never stall.
        discard_until_cancelled(&mut pose_rx, &mut control_rx, &cancel_token).await;
    }

    tracing::info!(
        "Counting session ended after {} windows, count {}",
        session.pipeline.windows(),
        session.reconciler.display_count()
    );
    CountingParts {
        model: session.pipeline.into_model(),
        pose_rx,
        control_rx,
    }
}

async fn count_until_cancelled(
    session: &mut CountingSession,
    pose_rx: &mut Receiver<PoseFrame>,
    control_rx: &mut Receiver<CountingCommand>,
    cancel_token: &CancellationToken,
) -> Result<(), AppError> {
    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                tracing::debug!("Counting session cancelled");
                return Ok(());
            }
            Some(command) = control_rx.recv() => match command {
                CountingCommand::ClearDisplay => {
                    // Frames queued ahead of the command came from the previous camera.
                    while let Ok(pose_frame) = pose_rx.try_recv() {
                        session.count(pose_frame).await?;
                    }
                    session.clear_display();
                }
            },
            pose_frame = pose_rx.recv() => match pose_frame {
                Some(pose_frame) => session.count(pose_frame).await?,
                None => {
                    tracing::info!("Pose stream closed");
                    return Ok(());
                }
            },
        }
    }
}

async fn discard_until_cancelled(
    pose_rx: &mut Receiver<PoseFrame>,
    control_rx: &mut Receiver<CountingCommand>,
    cancel_token: &CancellationToken,
) {
    let mut discarded: u64 = 0;
    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => break,
            Some(_) = control_rx.recv() => {}
            pose_frame = pose_rx.recv() => match pose_frame {
                Some(_) => discarded += 1,
                None => break,
            },
        }
    }
    tracing::debug!("Discarded {} pose frames after counting failed", discarded);
}

pub struct CoordinatorBuilder {
    configuration: Configuration,
    source: Option<Arc<dyn FrameSource>>,
    estimator: Option<Arc<dyn PoseEstimator>>,
    renderer: Option<Arc<dyn RenderTarget>>,
    model: Option<Box<dyn RepetitionModel>>,
}

impl CoordinatorBuilder {
    pub fn new(configuration: Configuration) -> Self {
        Self {
            configuration,
            source: None,
            estimator: None,
            renderer: None,
            model: None,
        }
    }

    // Sets the initial camera, this will override the default configuration.
    pub fn camera(mut self, camera: CameraConfiguration) -> Self {
        self.configuration.camera = camera;
        self
    }

    // Adjusts the sliding window, this will override the default configuration.
    pub fn window(mut self, length: usize, stride: usize) -> Self {
        self.configuration.pipeline.window_length = length;
        self.configuration.pipeline.window_stride = stride;
        self
    }

    // Adjusts the frame rate reduction, this will override the default configuration.
    pub fn downsample_factor(mut self, factor: usize) -> Self {
        self.configuration.pipeline.downsample_factor = factor;
        self
    }

    pub fn reset_counting_on_toggle(mut self, reset: bool) -> Self {
        self.configuration.reset_counting_on_toggle = reset;
        self
    }

    pub fn frame_source(mut self, source: impl FrameSource + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    pub fn pose_estimator(mut self, estimator: impl PoseEstimator + 'static) -> Self {
        self.estimator = Some(Arc::new(estimator));
        self
    }

    pub fn render_target(mut self, renderer: impl RenderTarget + 'static) -> Self {
        self.renderer = Some(Arc::new(renderer));
        self
    }

    pub fn model(mut self, model: impl RepetitionModel + 'static) -> Self {
        self.model = Some(Box::new(model));
        self
    }

    pub fn build(self) -> Result<Coordinator, AppError> {
        self.configuration.validate()?;
        let source = self
            .source
            .ok_or(AppError::Pipeline("Frame source not set".to_string()))?;
        let estimator = self
            .estimator
            .ok_or(AppError::Pipeline("Pose estimator not set".to_string()))?;
        let renderer = self
            .renderer
            .ok_or(AppError::Pipeline("Render target not set".to_string()))?;
        let model = self
            .model
            .ok_or(AppError::Pipeline("Repetition model not set".to_string()))?;

        let (pose_tx, pose_rx) = mpsc::channel(self.configuration.channels.counting_buffer_size);
        let (control_tx, control_rx) = mpsc::channel(CONTROL_BUFFER_SIZE);
        Ok(Coordinator {
            camera: self.configuration.camera,
            configuration: self.configuration,
            source,
            estimator,
            renderer,
            view: Arc::new(ViewState::new()),
            pose_tx,
            control_tx,
            idle_counting: Some(CountingParts {
                model,
                pose_rx,
                control_rx,
            }),
            counting_failed: Arc::new(AtomicBool::new(false)),
            display_task: None,
            counting_task: None,
        })
    }
}
