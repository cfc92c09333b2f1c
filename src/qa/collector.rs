//! Assertion call collection.
//!
//! Every assertion-style check routes through an [`AssertWrapper`], which
//! records exactly one [`Call`] per invocation (pass, fail, or error) before
//! letting the outcome, errors included, continue unchanged. The wrapper is
//! an observer only; it never alters results or swallows errors.

use chrono::{DateTime, Utc};

use crate::errors::Result;

/// Outcome of one assertion invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    /// The check returned normally.
    Pass,
    /// The check raised an assertion failure (expected-vs-actual mismatch).
    Fail,
    /// The check raised anything else.
    Error,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Pass => "pass",
            CallStatus::Fail => "fail",
            CallStatus::Error => "error",
        }
    }
}

/// Immutable record of one assertion invocation.
#[derive(Debug, Clone)]
pub struct Call {
    pub name: &'static str,
    pub timestamp: DateTime<Utc>,
    pub args: Vec<String>,
    pub status: CallStatus,
}

/// Owns the insertion-ordered call log for one instrumented assertion method.
///
/// Created when the owning [`Asserter`](crate::qa::Asserter) is built,
/// accumulates for the life of the run, and is readable afterwards through
/// [`AssertWrapper::calls`].
#[derive(Debug)]
pub struct AssertWrapper {
    name: &'static str,
    calls: Vec<Call>,
}

impl AssertWrapper {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            calls: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn collect(&mut self, status: CallStatus, args: Vec<String>) {
        self.calls.push(Call {
            name: self.name,
            timestamp: Utc::now(),
            args,
            status,
        });
    }

    /// Run `check`, record its outcome, and propagate it untouched.
    ///
    /// Exactly one [`Call`] is appended per invocation, before any error
    /// continues upward.
    pub fn invoke<F>(&mut self, args: Vec<String>, check: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        let outcome = check();
        let status = match &outcome {
            Ok(()) => CallStatus::Pass,
            Err(err) if err.is_check_failure() => CallStatus::Fail,
            Err(_) => CallStatus::Error,
        };
        self.collect(status, args);
        outcome
    }

    /// The recorded calls, oldest first.
    pub fn calls(&self) -> &[Call] {
        &self.calls
    }
}
