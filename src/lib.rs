pub mod app;
pub mod common;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod intake;
pub mod pipeline;
pub mod simulation;

pub use config::Configuration;
pub use coordinator::{Coordinator, CoordinatorBuilder, CountingCommand};
pub use error::AppError;
