use tokio::sync::watch;
use uuid::Uuid;

use crate::config::CameraPosition;
use crate::pipeline::reconciler::Reconciled;

/// What the presentation layer shows as the repetition counter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CountSnapshot {
    pub session: Uuid,
    pub display_count: f32,
    pub last_cumulative: f32,
    pub windows: u64,
}

impl CountSnapshot {
    pub fn zero(session: Uuid) -> Self {
        Self {
            session,
            display_count: 0.0,
            last_cumulative: 0.0,
            windows: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineStatus {
    Idle,
    Running(CameraPosition),
    Failed(String),
    Stopped,
}

/// UI-visible state. Readers subscribe to watch channels; the counter is
/// only ever written by the counting task through [`ViewState::publish_count`].
pub struct ViewState {
    count_tx: watch::Sender<CountSnapshot>,
    status_tx: watch::Sender<PipelineStatus>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewState {
    pub fn new() -> Self {
        let (count_tx, _) = watch::channel(CountSnapshot::zero(Uuid::nil()));
        let (status_tx, _) = watch::channel(PipelineStatus::Idle);
        Self {
            count_tx,
            status_tx,
        }
    }

    pub fn subscribe_count(&self) -> watch::Receiver<CountSnapshot> {
        self.count_tx.subscribe()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<PipelineStatus> {
        self.status_tx.subscribe()
    }

    pub fn count(&self) -> CountSnapshot {
        *self.count_tx.borrow()
    }

    pub fn status(&self) -> PipelineStatus {
        self.status_tx.borrow().clone()
    }

    pub(crate) fn publish_count(&self, snapshot: CountSnapshot) {
        self.count_tx.send_replace(snapshot);
    }

    pub(crate) fn publish_reconciled(&self, session: Uuid, reconciled: &Reconciled, windows: u64) {
        self.publish_count(CountSnapshot {
            session,
            display_count: reconciled.display_count,
            last_cumulative: reconciled.cumulative,
            windows,
        });
    }

    pub(crate) fn set_status(&self, status: PipelineStatus) {
        self.status_tx.send_replace(status);
    }
}
