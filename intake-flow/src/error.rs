use thiserror::Error;

/// Errors raised by the intake flow.
///
/// Guard failures on user events are not errors: those events are ignored.
/// Recommendation failures are caught by the controller and turned into the
/// apology message, so callers only see storage-level errors.
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Recommendation request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Recommendation service returned {status}: {detail}")]
    Service { status: u16, detail: String },

    #[error("Malformed recommendation response: {0}")]
    MalformedResponse(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, FlowError>;
