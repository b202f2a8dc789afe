//! Error types for convergence assertions
//!
//! Errors are structured with fields to aid diagnosis without re-running a
//! test: every variant names the target it was observing, and poll failures
//! carry the last state or client error that was seen.

use std::time::Duration;

use thiserror::Error;

use crate::classify::ClientError;

/// Placeholder used when a timed-out poll never recorded an observation
pub const NOTHING_OBSERVED: &str = "nothing observed";

/// Main error type for convergence assertions
#[derive(Debug, Error)]
pub enum Error {
    /// The poll budget ran out while the probe kept asking to retry
    #[error(
        "timed out after {waited:?} waiting for {target} ({attempts} attempts), last observed: {}",
        .last_observed.as_deref().unwrap_or(NOTHING_OBSERVED)
    )]
    Timeout {
        /// Target being observed (e.g. "Deployment tekton/controller")
        target: String,
        /// Configured poll budget
        waited: Duration,
        /// Number of probe invocations made
        attempts: u32,
        /// Last observed state reported by the probe
        last_observed: Option<String>,
    },

    /// The external system rejected an operation in a way retrying cannot fix
    #[error("{target}: {source}")]
    Fatal {
        /// Target being observed
        target: String,
        /// The client error that stopped polling
        #[source]
        source: ClientError,
    },

    /// A guard check failed before the guarded operation was attempted
    #[error("precondition failed for {target}: {message}")]
    Precondition {
        /// Target the precondition was checked against
        target: String,
        /// Why the precondition does not hold
        message: String,
    },

    /// Poll policy violates its invariants
    #[error("invalid poll policy: {message}")]
    InvalidPolicy {
        /// Description of what's invalid
        message: String,
    },

    /// Kube client could not be built
    #[error("client configuration error: {message}")]
    ClientConfig {
        /// Description of what failed
        message: String,
    },
}

impl Error {
    /// Create a timeout error
    pub fn timeout(
        target: impl Into<String>,
        waited: Duration,
        attempts: u32,
        last_observed: Option<String>,
    ) -> Self {
        Self::Timeout {
            target: target.into(),
            waited,
            attempts,
            last_observed,
        }
    }

    /// Create a fatal error wrapping the client error that caused it
    pub fn fatal(target: impl Into<String>, source: ClientError) -> Self {
        Self::Fatal {
            target: target.into(),
            source,
        }
    }

    /// Create a precondition error
    pub fn precondition(target: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Precondition {
            target: target.into(),
            message: msg.into(),
        }
    }

    /// Create an invalid policy error
    pub fn invalid_policy(msg: impl Into<String>) -> Self {
        Self::InvalidPolicy {
            message: msg.into(),
        }
    }

    /// Create a client configuration error
    pub fn client_config(msg: impl Into<String>) -> Self {
        Self::ClientConfig {
            message: msg.into(),
        }
    }

    /// True if the poll budget was exhausted ("it never happened")
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// True if the external system explicitly rejected the operation
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Fatal { .. })
    }

    /// Get the target this error is about, if any
    pub fn target(&self) -> Option<&str> {
        match self {
            Error::Timeout { target, .. } => Some(target),
            Error::Fatal { target, .. } => Some(target),
            Error::Precondition { target, .. } => Some(target),
            Error::InvalidPolicy { .. } => None,
            Error::ClientConfig { .. } => None,
        }
    }

    /// Get the underlying client error for fatal failures
    pub fn client_error(&self) -> Option<&ClientError> {
        match self {
            Error::Fatal { source, .. } => Some(source),
            _ => None,
        }
    }
}
