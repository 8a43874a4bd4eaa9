//! Error types for Mailrelay

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // Configuration Errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read config: {0}")]
    ConfigRead(String),

    #[error("Failed to parse config: {0}")]
    ConfigParse(String),

    // Internal Errors
    #[error("Internal error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidConfig(_) => "InvalidConfig",
            Error::ConfigRead(_) => "ConfigRead",
            Error::ConfigParse(_) => "ConfigParse",
            Error::InternalError(_) => "InternalError",
            Error::Io(_) => "Io",
            Error::Other(_) => "InternalError",
        }
    }

    /// Whether the error originates from user-supplied configuration.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Error::InvalidConfig(_) | Error::ConfigRead(_) | Error::ConfigParse(_)
        )
    }
}
