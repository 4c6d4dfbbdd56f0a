use async_trait::async_trait;

use crate::error::AppError;
use crate::pipeline::RepetitionModel;
use crate::pipeline::types::{JointName, Window};

/// Counts squats from hip height alone: a repetition is a descent below
/// `descend_y` followed by a rise above `rise_y` (image y grows downwards).
///
/// Windows overlap, so only the items after the previous window's last item
/// are scanned. That item is located by position from the end, which keeps
/// working when the camera is reopened and frame ids start over.
#[derive(Debug, Clone)]
pub struct HipDepthModel {
    descend_y: f32,
    rise_y: f32,
    last_id: Option<u64>,
    descended: bool,
    count: f32,
}

impl Default for HipDepthModel {
    fn default() -> Self {
        Self::new(0.62, 0.52)
    }
}

impl HipDepthModel {
    pub fn new(descend_y: f32, rise_y: f32) -> Self {
        Self {
            descend_y,
            rise_y,
            last_id: None,
            descended: false,
            count: 0.0,
        }
    }

    fn observe(&mut self, hip_y: f32) {
        if !self.descended && hip_y > self.descend_y {
            self.descended = true;
        } else if self.descended && hip_y < self.rise_y {
            self.descended = false;
            self.count += 1.0;
        }
    }
}

#[async_trait]
impl RepetitionModel for HipDepthModel {
    async fn predict(&mut self, window: &Window) -> Result<f32, AppError> {
        let items = window.items();
        let unseen = self
            .last_id
            .and_then(|last| items.iter().rposition(|item| item.id == last))
            .map_or(0, |position| position + 1);
        for item in &items[unseen..] {
            let hips: Vec<f32> = [JointName::LeftHip, JointName::RightHip]
                .iter()
                .filter_map(|name| item.feature.get(*name))
                .map(|joint| joint.y)
                .collect();
            if !hips.is_empty() {
                self.observe(hips.iter().sum::<f32>() / hips.len() as f32);
            }
        }
        if let Some(last) = window.last_id() {
            self.last_id = Some(last);
        }
        Ok(self.count)
    }

    fn reset(&mut self) {
        self.last_id = None;
        self.descended = false;
        self.count = 0.0;
    }

    fn name(&self) -> &'static str {
        "hip_depth"
    }
}
