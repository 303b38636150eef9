//! Error taxonomy for focus and input delivery.
//!
//! Nothing here escapes to the webhook layer: the dispatcher folds every
//! variant into a `FocusResult` and the router only logs it.

use std::time::Duration;

use claude_focus_protocol::FocusUrlError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FocusError {
    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error(transparent)]
    Url(#[from] FocusUrlError),

    #[error("invalid action: {0}")]
    InvalidAction(String),

    #[error("{0}")]
    AdapterUnavailable(String),

    #[error("failed to spawn {program}: {source}")]
    SpawnFailure {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {timeout:?}")]
    ProcessTimeout { program: String, timeout: Duration },

    #[error("{program} exited with status {}: {detail}", .code.map_or_else(|| "signal".to_string(), |c| c.to_string()))]
    NonZeroExit {
        program: String,
        code: Option<i32>,
        detail: String,
    },

    #[error("cannot reach {host}: {detail}")]
    RemoteUnreachable { host: String, detail: String },

    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

pub type FocusOutcome = Result<String, FocusError>;
