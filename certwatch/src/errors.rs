use thiserror::Error;

/// Structured error types for certwatch
#[derive(Error, Debug, Clone)]
pub enum CertWatchError {
    /// A provisioning profile could not be read as expected
    #[error("Parse error: {path}: {message}")]
    Parse { path: String, message: String },

    /// Calendar event could not be created or updated
    #[error("Calendar sync error: {message}")]
    Sync { message: String },

    /// Chat notification could not be delivered
    #[error("Notification error: {message}")]
    Notify { message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Authentication errors
    #[error("Authentication error: {service} authentication failed: {message}")]
    Authentication { service: String, message: String },

    /// Non-success responses from a remote API
    #[error("API error: {service} returned {status}: {message}")]
    Api {
        service: String,
        status: u16,
        message: String,
    },

    /// Network connectivity errors
    #[error("Network error: {message}")]
    Network { message: String },

    /// File system errors
    #[error("File system error: {operation} failed for path '{path}': {message}")]
    FileSystem {
        operation: String,
        path: String,
        message: String,
    },

    /// (De)serialization errors (JSON, TOML)
    #[error("Serialization error: {format}: {message}")]
    Serialization { format: String, message: String },
}

/// Result type alias using CertWatchError
pub type CertWatchResult<T> = std::result::Result<T, CertWatchError>;

impl CertWatchError {
    pub fn parse(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn file_system(operation: &str, path: &std::path::Path, error: std::io::Error) -> Self {
        Self::FileSystem {
            operation: operation.to_string(),
            path: path.display().to_string(),
            message: error.to_string(),
        }
    }
}

impl From<std::io::Error> for CertWatchError {
    fn from(error: std::io::Error) -> Self {
        Self::FileSystem {
            operation: "io".to_string(),
            path: "unknown".to_string(),
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for CertWatchError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: error.to_string(),
        }
    }
}

impl From<toml::de::Error> for CertWatchError {
    fn from(error: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: error.to_string(),
        }
    }
}

impl From<reqwest::Error> for CertWatchError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Network {
                message: format!("Request timed out: {}", error),
            }
        } else if error.is_connect() {
            Self::Network {
                message: format!("Connection failed: {}", error),
            }
        } else {
            Self::Network {
                message: error.to_string(),
            }
        }
    }
}

impl From<jsonwebtoken::errors::Error> for CertWatchError {
    fn from(error: jsonwebtoken::errors::Error) -> Self {
        Self::Authentication {
            service: "Google".to_string(),
            message: format!("Failed to sign service account assertion: {}", error),
        }
    }
}
