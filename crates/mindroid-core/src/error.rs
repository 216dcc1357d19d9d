//! The error domain shared by every layer of the runtime.
//!
//! One enum rather than per-module error types: transactions cross Looper,
//! Runtime and transport-plugin boundaries constantly, and callers need a
//! single `match` to decide whether to retry.

use std::fmt;

/// Stable error codes, useful for log correlation across processes.
pub mod codes {
    pub const TRANSACTION_FAILURE: &str = "binder.transaction_failure";
    pub const REMOTE_EXCEPTION: &str = "binder.remote_exception";
    pub const ILLEGAL_STATE: &str = "binder.illegal_state";
    pub const PARSE_ERROR: &str = "binder.parse_error";
    pub const TIMEOUT: &str = "binder.timeout";
    pub const INTERRUPTED: &str = "binder.interrupted";
}

/// Unified error type for the binder runtime.
///
/// Mirrors the error kinds spelled out in the spec's error-handling design:
/// transaction failures (target not found, transport down, malformed
/// parcel, oversize frame, timeout), remote exceptions carried verbatim from
/// a peer, illegal-state misuse, parse errors, and interrupted/timed-out
/// promise waits.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MindroidError {
    #[error("transaction failure: {0}")]
    TransactionFailure(String),

    #[error("remote exception: {0}")]
    RemoteException(String),

    #[error("illegal state: {0}")]
    IllegalState(String),

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("interrupted: {0}")]
    Interrupted(String),
}

impl MindroidError {
    pub fn code(&self) -> &'static str {
        match self {
            MindroidError::TransactionFailure(_) => codes::TRANSACTION_FAILURE,
            MindroidError::RemoteException(_) => codes::REMOTE_EXCEPTION,
            MindroidError::IllegalState(_) => codes::ILLEGAL_STATE,
            MindroidError::ParseError(_) => codes::PARSE_ERROR,
            MindroidError::Timeout(_) => codes::TIMEOUT,
            MindroidError::Interrupted(_) => codes::INTERRUPTED,
        }
    }

    pub fn transaction_failure(message: impl fmt::Display) -> Self {
        MindroidError::TransactionFailure(message.to_string())
    }

    pub fn remote_exception(message: impl fmt::Display) -> Self {
        MindroidError::RemoteException(message.to_string())
    }

    pub fn illegal_state(message: impl fmt::Display) -> Self {
        MindroidError::IllegalState(message.to_string())
    }

    pub fn parse_error(message: impl fmt::Display) -> Self {
        MindroidError::ParseError(message.to_string())
    }

    pub fn timeout(message: impl fmt::Display) -> Self {
        MindroidError::Timeout(message.to_string())
    }

    pub fn interrupted(message: impl fmt::Display) -> Self {
        MindroidError::Interrupted(message.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MindroidError>;
