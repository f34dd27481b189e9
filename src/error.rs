//! Error handling for camremote

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Device-reported JSON-RPC error
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Unknown setting key
    #[error("Unknown setting: {0}")]
    UnknownSetting(String),

    /// Setting has no reported options yet
    #[error("Setting not settable: {0}")]
    NotSettable(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Live-view framing or RPC envelope shape error
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// Config error
    #[error("Config error: {0}")]
    Config(String),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Timed out waiting for the device
    #[error("Timeout: {0}")]
    Timeout(String),
}

impl Error {
    /// Device rejected the request (as opposed to a transport failure)
    pub fn is_device_error(&self) -> bool {
        matches!(self, Error::Rpc { .. })
    }

    /// Transport-level failure worth retrying silently
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::Io(_) | Error::Network(_) | Error::Timeout(_)
        )
    }
}
