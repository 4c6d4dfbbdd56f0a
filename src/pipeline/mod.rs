pub mod counter;
#[allow(clippy::module_inception)]
pub mod pipeline;
pub mod reconciler;
pub mod router;
pub mod steps;
pub mod transformer;
pub mod types;

pub use counter::{RepetitionCounter, RepetitionModel};
pub use pipeline::CountingPipeline;
pub use reconciler::{CountReconciler, Reconciled};
pub use router::{OverflowPolicy, StreamRouter};
pub use transformer::{Chain, Transformer};
