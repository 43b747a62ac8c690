use thiserror::Error;

/// Errors that can occur when interacting with Azure Resource Manager.
#[derive(Error, Debug)]
pub enum ArmError {
    /// The service answered with a non-success HTTP status.
    #[error("Request failed with status {status}{}: {message}", code_suffix(.code))]
    RequestFailed {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// The long-running operation reached the `Failed` state.
    #[error("Operation failed ({code}): {message}")]
    OperationFailed { code: String, message: String },

    /// The long-running operation reached the `Canceled` state on the service.
    #[error("Operation was canceled by the service")]
    OperationCanceled,

    /// A polling response could not be interpreted.
    #[error("Polling error: {0}")]
    Polling(String),

    /// The caller used a handle in a way its current state does not allow.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The caller cancelled the wait locally.
    #[error("Operation wait was cancelled")]
    Cancelled,

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The request payload could not be serialized, or a response body
    /// could not be deserialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The HTTP request failed at the transport level.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint or a URL returned by the service is invalid.
    #[error("Invalid endpoint URL: {message}")]
    InvalidEndpoint {
        message: String,
        #[source]
        source: Option<url::ParseError>,
    },

    /// A required configuration value is missing.
    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    /// An argument supplied by the caller is invalid.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl ArmError {
    /// Build a [`ArmError::RequestFailed`] without a service error code.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::RequestFailed {
            status,
            code: None,
            message: message.into(),
        }
    }

    /// Build a [`ArmError::InvalidEndpoint`] carrying the URL parse failure.
    pub fn invalid_endpoint_with_source(message: impl Into<String>, source: url::ParseError) -> Self {
        Self::InvalidEndpoint {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Build a [`ArmError::InvalidEndpoint`] without an underlying cause.
    pub fn invalid_endpoint(message: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            message: message.into(),
            source: None,
        }
    }

    /// The HTTP status code, for errors produced by a completed exchange.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RequestFailed { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns `true` if the service answered `404 Not Found`.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref().map(|c| format!(" ({c})")).unwrap_or_default()
}

/// Result type alias for Resource Manager operations.
pub type ArmResult<T> = std::result::Result<T, ArmError>;
