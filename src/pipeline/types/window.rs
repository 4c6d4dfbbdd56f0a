use super::{Pose, TemporalFeature};
use chrono::{DateTime, Utc};

/// Fixed-length run of consecutive poses handed to the repetition model.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    items: Vec<TemporalFeature<Pose>>,
}

impl Window {
    pub(crate) fn new(items: Vec<TemporalFeature<Pose>>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[TemporalFeature<Pose>] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &TemporalFeature<Pose>> {
        self.items.iter()
    }

    pub fn first_id(&self) -> Option<u64> {
        self.items.first().map(|item| item.id)
    }

    pub fn last_id(&self) -> Option<u64> {
        self.items.last().map(|item| item.id)
    }

    pub fn last_captured_at(&self) -> Option<DateTime<Utc>> {
        self.items.last().map(|item| item.captured_at)
    }
}
