use async_trait::async_trait;

use crate::error::AppError;
use crate::pipeline::types::{CumulativeCount, TemporalFeature, Window};

/// Stateful action-counting model.
///
/// `predict` is called once per window, in window order, and returns the
/// total number of repetitions seen since the last `reset`.
#[async_trait]
pub trait RepetitionModel: Send {
    async fn predict(&mut self, window: &Window) -> Result<f32, AppError>;

    /// Forgets everything seen so far; the next `predict` starts a new count.
    fn reset(&mut self);

    fn name(&self) -> &'static str;
}

/// Final stage of the counting pipeline. Owns the model for one session and
/// invokes it strictly sequentially.
pub struct RepetitionCounter {
    model: Box<dyn RepetitionModel>,
    windows: u64,
}

impl RepetitionCounter {
    pub fn new(model: Box<dyn RepetitionModel>) -> Self {
        Self { model, windows: 0 }
    }

    /// Number of windows counted this session.
    pub fn windows(&self) -> u64 {
        self.windows
    }

    pub async fn count(&mut self, window: Window) -> Result<CumulativeCount, AppError> {
        let (id, captured_at) = match (window.last_id(), window.last_captured_at()) {
            (Some(id), Some(captured_at)) => (id, captured_at),
            _ => return Err(AppError::Pipeline("cannot count an empty window".to_string())),
        };
        let cumulative = self.model.predict(&window).await?;
        if !cumulative.is_finite() {
            return Err(AppError::Model(format!(
                "{} returned {} for the window ending at frame {}",
                self.model.name(),
                cumulative,
                id
            )));
        }
        self.windows += 1;
        tracing::trace!(
            "Model {} counted window {} ending at frame {}: {}",
            self.model.name(),
            self.windows,
            id,
            cumulative
        );
        Ok(TemporalFeature::new(id, captured_at, cumulative))
    }

    /// Hands the model back, reset, for the next session.
    pub fn into_model(self) -> Box<dyn RepetitionModel> {
        let mut model = self.model;
        model.reset();
        model
    }
}
