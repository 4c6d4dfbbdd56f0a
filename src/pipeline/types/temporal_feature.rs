use chrono::{DateTime, Utc};

/// A value tagged with its position in the source stream.
///
/// `id` is the ordering key: it is assigned by the frame source and carried
/// unchanged through every stage, so an item emitted late in the pipeline can
/// still be traced back to the camera tick that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct TemporalFeature<T> {
    pub id: u64,
    pub captured_at: DateTime<Utc>,
    pub feature: T,
}

impl<T> TemporalFeature<T> {
    pub fn new(id: u64, captured_at: DateTime<Utc>, feature: T) -> Self {
        Self {
            id,
            captured_at,
            feature,
        }
    }

    /// Replaces the payload, keeping the ordering key and capture time.
    pub fn map<U, F>(self, f: F) -> TemporalFeature<U>
    where
        F: FnOnce(T) -> U,
    {
        TemporalFeature {
            id: self.id,
            captured_at: self.captured_at,
            feature: f(self.feature),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_keeps_ordering_key_and_capture_time() {
        let now = Utc::now();
        let mapped = TemporalFeature::new(7, now, 2u32).map(|v| v as f32 * 1.5);
        assert_eq!(mapped.id, 7);
        assert_eq!(mapped.captured_at, now);
        assert_eq!(mapped.feature, 3.0);
    }
}
