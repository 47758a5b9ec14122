//! Error type for OSF API calls

/// Error from a single API request (page fetch or file download).
///
/// Carries enough structure for the run loop to decide whether a
/// failed preprint is worth another attempt, and for the resource
/// graph to recognize "legitimately absent" upstream resources.
#[derive(Debug)]
pub enum ApiError {
    /// HTTP error with optional status code
    Http {
        status: Option<u16>,
        message: String,
    },
    /// I/O error (file sink writes)
    Io(std::io::Error),
    /// Response body did not decode as the expected resource shape
    Decode(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http {
                status: Some(s),
                message,
            } => write!(f, "HTTP {s}: {message}"),
            Self::Http {
                status: None,
                message,
            } => write!(f, "HTTP error: {message}"),
            Self::Io(e) => write!(f, "IO: {e}"),
            Self::Decode(msg) => write!(f, "decode: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// Create HTTP error from reqwest error
    pub fn from_reqwest(e: &reqwest::Error) -> Self {
        Self::Http {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }

    /// Whether the whole preprint deserves another attempt.
    ///
    /// Timeouts, connection resets and server errors are transient.
    /// 401 (bad token), 403/404/410 (missing or denied resources) won't
    /// heal on retry, and a body that fails to decode never will.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status, .. } => !matches!(status, Some(401 | 403 | 404 | 410)),
            Self::Io(e) => e.kind() != std::io::ErrorKind::StorageFull,
            Self::Decode(_) => false,
        }
    }

    /// Check if the error means the resource is gone or access-denied.
    ///
    /// Supplementary node lookups may legitimately return 403/410 when a
    /// project was withdrawn or made private; callers treat that as
    /// "no supplementary material", not as a failure.
    pub fn is_resource_absent(&self) -> bool {
        matches!(
            self,
            Self::Http {
                status: Some(403 | 410),
                ..
            }
        )
    }
}

impl From<std::io::Error> for ApiError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
