use thiserror::Error;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Acquisition Error: {0}")]
    Acquisition(String),
    #[error("Estimation Error: {0}")]
    Estimation(String),
    #[error("Model Error: {0}")]
    Model(String),
    #[error("Configuration Error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Pipeline Error: {0}")]
    Pipeline(String),
    #[error("Task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
