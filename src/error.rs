/// Failures a detection or chat round-trip can end in.
///
/// Controllers never let these escape as unhandled errors: they become a
/// queued [`Notice`](crate::session::Notice) or a fallback chat message.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("{0}")]
    Validation(String),

    #[error("Unable to connect to the server. Make sure the detection API is running at {base_url}")]
    Connectivity { base_url: String },

    #[error("Service error {status}: {message}")]
    Service { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Protocol(String),
}

impl SessionError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Whether running the same request again could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connectivity { .. } | Self::Service { .. })
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid API base URL {value:?}: {reason}")]
    InvalidBaseUrl { value: String, reason: String },

    #[error("Invalid request timeout {0:?}, expected a whole number of seconds")]
    InvalidTimeout(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}
