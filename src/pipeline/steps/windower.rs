use std::collections::VecDeque;
use std::num::NonZeroUsize;

use crate::pipeline::transformer::Transformer;
use crate::pipeline::types::{Pose, TemporalFeature, Window};

/// Sliding window over the pose sequence.
///
/// Holds the last `length` items in a fixed-capacity ring. A window is
/// emitted once the ring is full and `stride` items have arrived since the
/// previous emission; consecutive windows overlap by `length - stride` items.
/// A partially filled ring is never emitted.
pub struct Windower {
    length: NonZeroUsize,
    stride: NonZeroUsize,
    buffer: VecDeque<TemporalFeature<Pose>>,
    since_last_emit: usize,
}

impl Windower {
    pub fn new(length: NonZeroUsize, stride: NonZeroUsize) -> Self {
        Self {
            length,
            stride,
            buffer: VecDeque::with_capacity(length.get()),
            since_last_emit: 0,
        }
    }

    pub fn length(&self) -> usize {
        self.length.get()
    }

    pub fn stride(&self) -> usize {
        self.stride.get()
    }

    /// Number of items currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_ready(&self) -> bool {
        self.buffer.len() == self.length.get()
    }
}

impl Transformer for Windower {
    type Input = TemporalFeature<Pose>;
    type Output = Window;

    fn apply(&mut self, input: TemporalFeature<Pose>) -> Option<Window> {
        if self.buffer.len() == self.length.get() {
            self.buffer.pop_front();
        }
        self.buffer.push_back(input);
        self.since_last_emit += 1;

        if !self.is_ready() || self.since_last_emit < self.stride.get() {
            return None;
        }
        self.since_last_emit = 0;
        Some(Window::new(self.buffer.iter().cloned().collect()))
    }

    fn name(&self) -> &'static str {
        "windower"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn windower(length: usize, stride: usize) -> Windower {
        Windower::new(
            NonZeroUsize::new(length).unwrap(),
            NonZeroUsize::new(stride).unwrap(),
        )
    }

    fn feed(windower: &mut Windower, ids: std::ops::Range<u64>) -> Vec<(u64, Window)> {
        ids.filter_map(|id| {
            windower
                .apply(TemporalFeature::new(id, Utc::now(), Pose::new()))
                .map(|window| (id, window))
        })
        .collect()
    }

    #[test]
    fn ninety_by_five_emits_twice_for_ninety_five_items() {
        let mut w = windower(90, 5);
        let windows = feed(&mut w, 1..96);
        let emitted_at: Vec<u64> = windows.iter().map(|(id, _)| *id).collect();
        assert_eq!(emitted_at, vec![90, 95]);
        assert!(windows.iter().all(|(_, window)| window.len() == 90));
    }

    #[test]
    fn nothing_before_buffer_fills() {
        let mut w = windower(10, 1);
        assert!(feed(&mut w, 0..9).is_empty());
        assert_eq!(w.buffered(), 9);
        assert_eq!(feed(&mut w, 9..10).len(), 1);
    }

    #[test]
    fn consecutive_windows_overlap_by_length_minus_stride() {
        let mut w = windower(8, 3);
        let windows = feed(&mut w, 0..30);
        assert_eq!(windows.len(), 1 + (30 - 8) / 3);
        for pair in windows.windows(2) {
            let (_, prev) = &pair[0];
            let (_, next) = &pair[1];
            let overlap = prev
                .iter()
                .filter(|item| next.iter().any(|other| other.id == item.id))
                .count();
            assert_eq!(overlap, 8 - 3);
            assert_eq!(next.first_id().unwrap(), prev.first_id().unwrap() + 3);
        }
    }

    #[test]
    fn window_items_are_in_arrival_order() {
        let mut w = windower(4, 2);
        let windows = feed(&mut w, 10..16);
        let ids: Vec<u64> = windows[1].1.iter().map(|item| item.id).collect();
        assert_eq!(ids, vec![12, 13, 14, 15]);
    }

    #[test]
    fn stride_equal_to_length_yields_disjoint_windows() {
        let mut w = windower(5, 5);
        let windows = feed(&mut w, 0..17);
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[2].1.first_id(), Some(10));
    }
}
