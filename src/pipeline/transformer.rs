use futures::{Stream, StreamExt, future};

/// A synchronous stream stage: consumes one item, emits zero or one item.
///
/// Stages are chained with [`Transformer::appending`]; the chain is itself a
/// `Transformer`, so a whole chain composes exactly like a single stage.
pub trait Transformer: Send {
    type Input;
    type Output;

    fn apply(&mut self, input: Self::Input) -> Option<Self::Output>;

    fn name(&self) -> &'static str;

    fn appending<T>(self, next: T) -> Chain<Self, T>
    where
        Self: Sized,
        T: Transformer<Input = Self::Output>,
    {
        Chain {
            first: self,
            second: next,
        }
    }

    /// Lazily applies this stage to every item of `input`, in order.
    fn transform<S>(mut self, input: S) -> impl Stream<Item = Self::Output> + Send
    where
        Self: Sized + 'static,
        S: Stream<Item = Self::Input> + Send + 'static,
        Self::Output: Send,
    {
        input.filter_map(move |item| future::ready(self.apply(item)))
    }
}

/// Two stages run back to back.
pub struct Chain<A, B> {
    first: A,
    second: B,
}

impl<A, B> Chain<A, B> {
    pub fn first(&self) -> &A {
        &self.first
    }

    pub fn second(&self) -> &B {
        &self.second
    }
}

impl<A, B> Transformer for Chain<A, B>
where
    A: Transformer,
    B: Transformer<Input = A::Output>,
{
    type Input = A::Input;
    type Output = B::Output;

    fn apply(&mut self, input: Self::Input) -> Option<Self::Output> {
        let intermediate = self.first.apply(input)?;
        self.second.apply(intermediate)
    }

    fn name(&self) -> &'static str {
        "chain"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    struct KeepEven;

    impl Transformer for KeepEven {
        type Input = u32;
        type Output = u32;

        fn apply(&mut self, input: u32) -> Option<u32> {
            (input % 2 == 0).then_some(input)
        }

        fn name(&self) -> &'static str {
            "keep_even"
        }
    }

    struct RunningTotal(u32);

    impl Transformer for RunningTotal {
        type Input = u32;
        type Output = u32;

        fn apply(&mut self, input: u32) -> Option<u32> {
            self.0 += input;
            Some(self.0)
        }

        fn name(&self) -> &'static str {
            "running_total"
        }
    }

    #[test]
    fn chain_short_circuits_dropped_items() {
        let mut chain = KeepEven.appending(RunningTotal(0));
        let out: Vec<_> = (1..=6).filter_map(|i| chain.apply(i)).collect();
        assert_eq!(out, vec![2, 6, 12]);
        assert_eq!(chain.second().0, 12);
    }

    #[tokio::test]
    async fn transform_preserves_order() {
        let out: Vec<u32> = KeepEven
            .appending(RunningTotal(0))
            .transform(stream::iter(1..=4))
            .collect()
            .await;
        assert_eq!(out, vec![2, 6]);
    }
}
