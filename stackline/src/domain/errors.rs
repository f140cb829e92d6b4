//! Structured error types for stackline
//!
//! Using thiserror for automatic Display implementation and error chaining.
//!
//! These errors are confined to the debug-service boundary: establishing a
//! session can fail in all the ways below, but none of them ever surface
//! from the frame-query operations. A session whose attach failed answers
//! every query with the empty/zero sentinels instead.

use std::time::Duration;

use super::types::Pid;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Debug service is not available on {os}")]
    Unsupported { os: &'static str },

    #[error("Non-invasive attach is limited to the current process (requested {requested}, running as {current})")]
    ForeignProcess { requested: Pid, current: Pid },

    #[error("Attach did not complete within {timeout:?}")]
    AttachTimedOut { timeout: Duration },

    #[error("Attach worker exited without reporting a result")]
    AttachAborted,

    #[error("Service queried before an attach was started")]
    NotAttached,

    #[error("Failed to load debug image: {0}")]
    ImageLoad(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
