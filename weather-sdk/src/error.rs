use thiserror::Error;

/// Every failure the SDK surfaces to callers.
#[derive(Debug, Error)]
pub enum SdkError {
    #[error("configuration error: {0:#}")]
    Config(anyhow::Error),

    #[error("an SDK instance with this API key already exists")]
    DuplicateKey,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("SDK instance has been destroyed")]
    Destroyed,

    #[error("failed to fetch weather data: {0}")]
    Transport(String),

    #[error("failed to decode weather data: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Coarse discriminant of [`SdkError`], handy for matching without messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Config,
    DuplicateKey,
    InvalidArgument,
    Destroyed,
    Transport,
    Decode,
}

impl SdkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SdkError::Config(_) => ErrorKind::Config,
            SdkError::DuplicateKey => ErrorKind::DuplicateKey,
            SdkError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            SdkError::Destroyed => ErrorKind::Destroyed,
            SdkError::Transport(_) => ErrorKind::Transport,
            SdkError::Decode(_) => ErrorKind::Decode,
        }
    }

    pub(crate) fn config(msg: impl std::fmt::Display) -> Self {
        SdkError::Config(anyhow::anyhow!("{msg}"))
    }
}

impl From<anyhow::Error> for SdkError {
    fn from(err: anyhow::Error) -> Self {
        SdkError::Config(err)
    }
}

pub type Result<T, E = SdkError> = std::result::Result<T, E>;
