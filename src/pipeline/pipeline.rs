use futures::{Stream, StreamExt, stream};

use crate::config::PipelineConfiguration;
use crate::error::AppError;
use crate::pipeline::counter::{RepetitionCounter, RepetitionModel};
use crate::pipeline::steps::{FeatureSelector, RateReducer, SubjectSelector, Windower};
use crate::pipeline::transformer::{Chain, Transformer};
use crate::pipeline::types::{CumulativeCount, PoseSet};

type PoseStages =
    Chain<Chain<Chain<RateReducer<PoseSet>, SubjectSelector>, FeatureSelector>, Windower>;

/// Rate reduction, subject selection, joint selection and windowing, followed
/// by the repetition model. One instance lives for exactly one counting
/// session; a restart builds a new one.
pub struct CountingPipeline {
    stages: PoseStages,
    counter: RepetitionCounter,
}

impl CountingPipeline {
    pub fn new(
        configuration: &PipelineConfiguration,
        model: Box<dyn RepetitionModel>,
    ) -> Result<Self, AppError> {
        configuration.validate()?;
        let stages = RateReducer::new(configuration.downsample_factor()?)
            .appending(SubjectSelector::new(configuration.confidence_threshold))
            .appending(FeatureSelector::new(
                configuration.selected_joints.iter().copied(),
            ))
            .appending(Windower::new(
                configuration.window_length()?,
                configuration.window_stride()?,
            ));
        tracing::debug!(
            "Counting pipeline: {} -> {} -> {} -> {} -> {}",
            stages.first().first().first().name(),
            stages.first().first().second().name(),
            stages.first().second().name(),
            stages.second().name(),
            model.name()
        );
        Ok(Self {
            stages,
            counter: RepetitionCounter::new(model),
        })
    }

    /// Feeds one frame's poses through the chain. Returns a cumulative count
    /// when the frame completed a window.
    pub async fn process(&mut self, poses: PoseSet) -> Result<Option<CumulativeCount>, AppError> {
        match self.stages.apply(poses) {
            Some(window) => self.counter.count(window).await.map(Some),
            None => Ok(None),
        }
    }

    /// Windows counted so far in this session.
    pub fn windows(&self) -> u64 {
        self.counter.windows()
    }

    /// Lazily counts a whole pose stream. Items are processed one at a time,
    /// so the model is never invoked concurrently.
    pub fn count<S>(self, input: S) -> impl Stream<Item = Result<CumulativeCount, AppError>> + Send
    where
        S: Stream<Item = PoseSet> + Send + 'static,
    {
        let Self { stages, counter } = self;
        let windows = Box::pin(stages.transform(input));
        stream::unfold((counter, windows), |(mut counter, mut windows)| async move {
            let window = windows.next().await?;
            let count = counter.count(window).await;
            Some((count, (counter, windows)))
        })
    }

    /// Tears the session down, returning the model reset for the next one.
    pub fn into_model(self) -> Box<dyn RepetitionModel> {
        self.counter.into_model()
    }
}
