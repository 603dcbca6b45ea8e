use thiserror::Error;

/// Top-level error type for the NestForge runtime.
#[derive(Debug, Error)]
pub enum NestError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("gateway transport error: {0}")]
    Transport(String),

    #[error("channel error: {0}")]
    ChannelError(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
