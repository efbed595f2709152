use thiserror::Error;

use crate::types::Side;

/// A manual correction the engine refused. The game state is left untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("no game in progress")]
    GameNotInProgress,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SetupError {
    #[error("no match loaded")]
    NoMatchLoaded,

    #[error("{team} team needs {expected} player(s), found {found}")]
    RosterSize {
        team: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("player {name} is not on the {side:?} team")]
    UnknownPlayer { name: String, side: Side },
}

/// Transport-level failure reported by a `Transport` implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("device is offline")]
    Offline,

    #[error("request timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("network failure: {0}")]
    Network(String),
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("match {0} not found")]
    NotFound(String),

    #[error("match request failed: {0}")]
    Transport(#[from] TransportError),

    #[error("match request failed with HTTP {0}")]
    Status(u16),

    #[error("malformed match data: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Why a score submission failed. The variant only drives operator messaging;
/// every cause is retried under the same attempt cap.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("network connection failed: {0}")]
    Network(String),

    #[error("request timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("authentication failed (401)")]
    Unauthorized,

    #[error("tournament API endpoint not found (404)")]
    NotFound,

    #[error("tournament server error ({status})")]
    Server { status: u16 },

    #[error("submission rejected with HTTP {status}")]
    Rejected { status: u16 },

    #[error("server did not confirm the submission")]
    NotConfirmed,

    #[error("malformed response: {0}")]
    Unknown(String),
}

impl SubmissionError {
    /// Maps a non-2xx HTTP status onto the operator-facing categories.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => SubmissionError::Unauthorized,
            404 => SubmissionError::NotFound,
            500..=599 => SubmissionError::Server { status },
            _ => SubmissionError::Rejected { status },
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            SubmissionError::Network(_) => "NETWORK_ERROR",
            SubmissionError::Timeout { .. } => "TIMEOUT_ERROR",
            SubmissionError::Unauthorized => "UNAUTHORIZED",
            SubmissionError::NotFound => "API_NOT_FOUND",
            SubmissionError::Server { .. } => "SERVER_ERROR",
            SubmissionError::Rejected { .. }
            | SubmissionError::NotConfirmed
            | SubmissionError::Unknown(_) => "UNKNOWN_ERROR",
        }
    }

    pub fn operator_message(&self) -> String {
        match self {
            SubmissionError::Network(_) => {
                "Network connection failed - check internet connection".to_string()
            }
            SubmissionError::Timeout { .. } => {
                "Request timeout - server took too long to respond".to_string()
            }
            SubmissionError::Unauthorized => {
                "Authentication failed - invalid token (401)".to_string()
            }
            SubmissionError::NotFound => "Tournament API endpoint not found (404)".to_string(),
            SubmissionError::Server { status } => {
                format!("Tournament server error ({status}) - try again later")
            }
            other => other.to_string(),
        }
    }
}

impl From<TransportError> for SubmissionError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Offline => SubmissionError::Network("device is offline".to_string()),
            TransportError::Timeout { ms } => SubmissionError::Timeout { ms },
            TransportError::Network(msg) => SubmissionError::Network(msg),
        }
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("match {0} is already in the submission queue, process the queue first")]
    AlreadyQueued(String),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
