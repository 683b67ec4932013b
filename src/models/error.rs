use thiserror::Error;

#[derive(Error, Debug)]
pub enum CardError {
    #[error("Upstream error from {platform}: {message}")]
    UpstreamData { platform: String, message: String },

    #[error("Unreadable response from {platform}: {message}")]
    UpstreamPayload { platform: String, message: String },

    #[error("Handle {handle} not found on {platform}")]
    HandleNotFound { platform: String, handle: String },

    #[error("Rate limit exceeded for {platform}")]
    RateLimited { platform: String },

    #[error("{platform} responded with HTTP {status}")]
    UpstreamStatus { platform: String, status: u16 },

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Render error: {0}")]
    RenderInternal(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CardError {
    pub fn upstream(platform: &str, message: impl Into<String>) -> Self {
        CardError::UpstreamData {
            platform: platform.to_string(),
            message: message.into(),
        }
    }

    /// A response that arrived but could not be decoded. Repeating the call
    /// returns the same bytes, so this is never retried.
    pub fn payload(platform: &str, message: impl Into<String>) -> Self {
        CardError::UpstreamPayload {
            platform: platform.to_string(),
            message: message.into(),
        }
    }

    /// Whether a failed upstream call is worth repeating.
    ///
    /// Client errors (unknown handle, bad request) never succeed on retry;
    /// timeouts, rate limits and 5xx responses might.
    pub fn is_retryable(&self) -> bool {
        match self {
            CardError::RateLimited { .. } => true,
            CardError::UpstreamStatus { status, .. } => *status >= 500,
            CardError::UpstreamData { .. } => true,
            CardError::Http(e) => match e.status() {
                Some(status) => status.is_server_error(),
                None => e.is_timeout() || e.is_connect() || e.is_request(),
            },
            CardError::HandleNotFound { .. }
            | CardError::UpstreamPayload { .. }
            | CardError::MalformedInput(_)
            | CardError::RenderInternal(_)
            | CardError::Serialization(_)
            | CardError::Config(_) => false,
        }
    }

    /// Text embedded in a fallback image.
    pub fn fallback_message(&self) -> String {
        match self {
            CardError::HandleNotFound { handle, .. } => format!("User {} not found", handle),
            CardError::RateLimited { .. } => {
                "Upstream rate limit hit, try again shortly".to_string()
            }
            CardError::MalformedInput(message) => format!("Invalid request: {}", message),
            CardError::RenderInternal(_) => {
                "Something went wrong while drawing this card".to_string()
            }
            CardError::Config(_) => "Service misconfigured".to_string(),
            CardError::UpstreamData { platform, .. }
            | CardError::UpstreamPayload { platform, .. }
            | CardError::UpstreamStatus { platform, .. } => {
                format!("Could not fetch data from {}", platform)
            }
            CardError::Http(_) | CardError::Serialization(_) => {
                "Could not fetch profile data".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, CardError>;
