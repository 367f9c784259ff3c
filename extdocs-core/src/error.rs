//! Error types for documentation rendering

#[derive(Debug, thiserror::Error)]
pub enum DocError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Too Many Requests")]
    RateLimited,

    #[error("{0}")]
    UpstreamProtocol(String),

    #[error("{message}")]
    UpstreamStatus { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid node: {0}")]
    InvalidNode(String),

    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Embed cycle detected at block {0}")]
    ReferenceCycle(String),

    #[error("Config parse error: {0}")]
    ConfigParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DocError {
    /// Error for a graph store that answered without the expected redirect.
    pub fn missing_redirect(status: u16) -> Self {
        Self::UpstreamProtocol(format!(
            "Expected an immediate redirect (307), got: {}",
            status
        ))
    }

    /// Error for a redirect whose `Location` does not form a usable URL.
    pub fn bad_location(location: &str, err: impl std::fmt::Display) -> Self {
        Self::UpstreamProtocol(format!("Bad redirect location {location}: {err}"))
    }

    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::UpstreamProtocol(_) | Self::UpstreamStatus { .. } | Self::Http(_)
        )
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited)
    }
}
