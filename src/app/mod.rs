pub mod render;
pub mod state;

pub use render::RenderTarget;
pub use state::{CountSnapshot, PipelineStatus, ViewState};
