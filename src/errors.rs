use thiserror::Error;

#[derive(Debug, Error)]
pub enum KioskError {
    #[error("DRIVER_FATAL: {0}")]
    DriverFatal(String),
    #[error("NAVIGATION: {0}")]
    Navigation(String),
    #[error("IO_FAILURE: {0}")]
    Io(String),
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl From<std::io::Error> for KioskError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<serde_json::Error> for KioskError {
    fn from(value: serde_json::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<anyhow::Error> for KioskError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

pub type KioskResult<T> = Result<T, KioskError>;
