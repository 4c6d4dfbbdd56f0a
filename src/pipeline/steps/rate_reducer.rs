use std::marker::PhantomData;
use std::num::NonZeroUsize;

use crate::pipeline::transformer::Transformer;

/// Keeps every `factor`-th item, starting with the first one.
///
/// Downstream stages see the source rate divided by `factor`, which also
/// makes the observed motion look faster to the repetition model.
pub struct RateReducer<T> {
    factor: NonZeroUsize,
    seen: usize,
    _item: PhantomData<fn(T) -> T>,
}

impl<T> RateReducer<T> {
    pub fn new(factor: NonZeroUsize) -> Self {
        Self {
            factor,
            seen: 0,
            _item: PhantomData,
        }
    }

    pub fn factor(&self) -> usize {
        self.factor.get()
    }
}

impl<T> Transformer for RateReducer<T> {
    type Input = T;
    type Output = T;

    fn apply(&mut self, input: T) -> Option<T> {
        let keep = self.seen == 0;
        self.seen = (self.seen + 1) % self.factor.get();
        keep.then_some(input)
    }

    fn name(&self) -> &'static str {
        "rate_reducer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reduce(factor: usize, count: usize) -> Vec<usize> {
        let mut reducer = RateReducer::new(NonZeroUsize::new(factor).unwrap());
        (0..count).filter_map(|i| reducer.apply(i)).collect()
    }

    #[test]
    fn emits_ceiling_of_input_over_factor() {
        for factor in 1..=7 {
            for count in 0..40 {
                assert_eq!(reduce(factor, count).len(), count.div_ceil(factor));
            }
        }
    }

    #[test]
    fn keeps_first_of_every_group_in_order() {
        assert_eq!(reduce(3, 10), vec![0, 3, 6, 9]);
    }

    #[test]
    fn factor_one_passes_everything() {
        assert_eq!(reduce(1, 5), vec![0, 1, 2, 3, 4]);
    }
}
