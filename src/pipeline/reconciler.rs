use crate::pipeline::types::CumulativeCount;

/// Default tolerance under which a cumulative sample counts as "not increasing".
pub const DEFAULT_STALL_EPSILON: f32 = 0.001;

/// Outcome of reconciling one cumulative sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reconciled {
    pub id: u64,
    pub cumulative: f32,
    pub delta: f32,
    pub display_count: f32,
    /// The model output did not grow by more than the stall tolerance.
    pub stalled: bool,
}

/// Turns the model's cumulative output into a display counter that never
/// goes down within a session.
///
/// Positive increments are added however small. Flat or decreasing samples
/// are ignored, but they still become the reference for the next delta.
#[derive(Debug, Clone)]
pub struct CountReconciler {
    last_cumulative: f32,
    display_count: f32,
    stall_epsilon: f32,
}

impl Default for CountReconciler {
    fn default() -> Self {
        Self::new(DEFAULT_STALL_EPSILON)
    }
}

impl CountReconciler {
    pub fn new(stall_epsilon: f32) -> Self {
        Self {
            last_cumulative: 0.0,
            display_count: 0.0,
            stall_epsilon,
        }
    }

    pub fn display_count(&self) -> f32 {
        self.display_count
    }

    pub fn last_cumulative(&self) -> f32 {
        self.last_cumulative
    }

    pub fn reconcile(&mut self, count: &CumulativeCount) -> Reconciled {
        let cumulative = count.feature;
        let delta = cumulative - self.last_cumulative;
        if delta > 0.0 {
            self.display_count += delta;
        }
        let stalled = delta <= self.stall_epsilon;
        tracing::trace!(
            "Cumulative count {}, last count {}, incremental count {}, display count {}",
            cumulative,
            self.last_cumulative,
            delta,
            self.display_count
        );
        self.last_cumulative = cumulative;
        Reconciled {
            id: count.id,
            cumulative,
            delta,
            display_count: self.display_count,
            stalled,
        }
    }

    /// Session restart: the model starts a new cumulative sequence near zero.
    pub fn reset(&mut self) {
        self.last_cumulative = 0.0;
        self.display_count = 0.0;
    }

    /// Zeroes the visible counter only; deltas keep being computed against
    /// the last received sample.
    pub fn clear_display(&mut self) {
        self.display_count = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::TemporalFeature;
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn sample(id: u64, value: f32) -> CumulativeCount {
        TemporalFeature::new(id, Utc::now(), value)
    }

    fn trajectory(reconciler: &mut CountReconciler, values: &[f32]) -> Vec<f32> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| reconciler.reconcile(&sample(i as u64, *v)).display_count)
            .collect()
    }

    #[test]
    fn ignores_decrease_and_measures_from_last_received() {
        let mut reconciler = CountReconciler::default();
        let display = trajectory(&mut reconciler, &[0.0, 0.0, 1.0, 1.0, 2.3, 2.1, 3.0]);
        let expected = [0.0, 0.0, 1.0, 1.0, 2.3, 2.3, 3.2];
        for (got, want) in display.iter().zip(expected) {
            assert!((got - want).abs() < 1e-5, "got {got}, want {want}");
        }
        assert_eq!(reconciler.last_cumulative(), 3.0);
    }

    #[test]
    fn repeated_sample_is_idempotent() {
        let mut reconciler = CountReconciler::default();
        let first = reconciler.reconcile(&sample(0, 1.7));
        let second = reconciler.reconcile(&sample(1, 1.7));
        assert_eq!(second.delta, 0.0);
        assert!(second.stalled);
        assert_eq!(first.display_count, second.display_count);
    }

    #[test]
    fn tiny_positive_increments_are_accepted() {
        let mut reconciler = CountReconciler::default();
        let out = reconciler.reconcile(&sample(0, 0.0005));
        assert!(out.stalled);
        assert_eq!(out.display_count, 0.0005);
    }

    #[test]
    fn display_count_never_decreases() {
        let mut rng = StdRng::seed_from_u64(7);
        let values: Vec<f32> = (0..500).map(|_| rng.random_range(-2.0..10.0)).collect();
        let mut reconciler = CountReconciler::default();
        let display = trajectory(&mut reconciler, &values);
        assert!(display.windows(2).all(|pair| pair[1] >= pair[0]));
    }

    #[test]
    fn reset_zeroes_both_fields() {
        let mut reconciler = CountReconciler::default();
        trajectory(&mut reconciler, &[1.0, 4.0, 9.5]);
        reconciler.reset();
        assert_eq!(reconciler.display_count(), 0.0);
        assert_eq!(reconciler.last_cumulative(), 0.0);
        assert_eq!(reconciler.reconcile(&sample(9, 0.5)).display_count, 0.5);
    }

    #[test]
    fn clear_display_keeps_baseline() {
        let mut reconciler = CountReconciler::default();
        trajectory(&mut reconciler, &[2.0, 5.0]);
        reconciler.clear_display();
        assert_eq!(reconciler.reconcile(&sample(2, 6.0)).display_count, 1.0);
    }
}
