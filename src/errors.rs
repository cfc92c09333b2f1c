//! Corral Error Handling
//!
//! One crate-wide error enum with stable diagnostic codes. Assertion failures
//! are a distinct variant so the QA harness can tell an expected-vs-actual
//! mismatch (`fail`) apart from an unexpected fault (`error`) without string
//! matching.

use miette::Diagnostic;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, CorralError>;

/// All failures surfaced by the pipeline core and the QA harness.
#[derive(Debug, Error, Diagnostic)]
pub enum CorralError {
    /// An assertion-style check observed a mismatch between expected and
    /// actual state. Recorded as `fail` by the collector, then propagated.
    #[error("check failed: {message}")]
    #[diagnostic(code(corral::qa::check_failed))]
    CheckFailed { message: String },

    /// A fatal configuration mistake (e.g. an unresolvable scope target).
    /// Never retried; this signals a bug to fix, not a transient condition.
    #[error("improperly configured: {message}")]
    #[diagnostic(
        code(corral::setup::improperly_configured),
        help("register the target as a Loader or a Step before referencing it")
    )]
    ImproperlyConfigured { message: String },

    /// An operation was attempted on a session after `close()`.
    #[error("session is closed")]
    #[diagnostic(code(corral::db::session_closed))]
    SessionClosed,

    /// A storage-backend fault (acquisition, commit, or rollback).
    #[error("database error: {message}")]
    #[diagnostic(code(corral::db::backend))]
    Db { message: String },

    /// A loader or step raised while processing.
    #[error("pipeline unit '{unit}' failed: {message}")]
    #[diagnostic(code(corral::run::pipeline))]
    Pipeline { unit: String, message: String },
}

impl CorralError {
    pub fn check(message: impl Into<String>) -> Self {
        Self::CheckFailed {
            message: message.into(),
        }
    }

    pub fn improperly_configured(message: impl Into<String>) -> Self {
        Self::ImproperlyConfigured {
            message: message.into(),
        }
    }

    pub fn db(message: impl Into<String>) -> Self {
        Self::Db {
            message: message.into(),
        }
    }

    pub fn pipeline(unit: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Pipeline {
            unit: unit.into(),
            message: message.into(),
        }
    }

    /// True only for the assertion-failure variant; the collector uses this
    /// to classify a check outcome as `fail` rather than `error`.
    pub fn is_check_failure(&self) -> bool {
        matches!(self, Self::CheckFailed { .. })
    }

    /// Stable diagnostic code for reporting.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::CheckFailed { .. } => "corral::qa::check_failed",
            Self::ImproperlyConfigured { .. } => "corral::setup::improperly_configured",
            Self::SessionClosed => "corral::db::session_closed",
            Self::Db { .. } => "corral::db::backend",
            Self::Pipeline { .. } => "corral::run::pipeline",
        }
    }
}
