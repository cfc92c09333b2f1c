//! Instrumented assertion surface handed to test units.
//!
//! An [`Asserter`] is built once per test unit, before its lifecycle runs:
//! every method in [`ASSERT_METHODS`] gets its own [`AssertWrapper`] in a
//! side table, so each invocation is logged with its arguments and outcome
//! and the whole log can be read back after the run.

use std::collections::BTreeMap;
use std::fmt::Debug;

use crate::db::Session;
use crate::errors::{CorralError, Result};
use crate::qa::collector::{AssertWrapper, Call};

/// Every assertion method the engine instruments. One wrapper per name is
/// created when the [`Asserter`] is built.
pub const ASSERT_METHODS: &[&str] = &[
    "assert_true",
    "assert_eq",
    "assert_ne",
    "assert_row_count",
];

/// The assertion side table for one test unit.
pub struct Asserter {
    wrappers: BTreeMap<&'static str, AssertWrapper>,
}

impl Default for Asserter {
    fn default() -> Self {
        Self::new()
    }
}

impl Asserter {
    pub fn new() -> Self {
        let wrappers = ASSERT_METHODS
            .iter()
            .map(|&name| (name, AssertWrapper::new(name)))
            .collect();
        Self { wrappers }
    }

    fn wrapper(&mut self, name: &'static str) -> &mut AssertWrapper {
        // All callers pass names from ASSERT_METHODS, inserted at construction.
        self.wrappers
            .get_mut(name)
            .unwrap_or_else(|| unreachable!("uninstrumented assertion: {name}"))
    }

    /// Check that `condition` holds; `label` describes what was asserted.
    pub fn assert_true(&mut self, label: &str, condition: bool) -> Result<()> {
        let args = vec![label.to_string(), condition.to_string()];
        self.wrapper("assert_true").invoke(args, || {
            if condition {
                Ok(())
            } else {
                Err(CorralError::check(format!("'{label}' does not hold")))
            }
        })
    }

    pub fn assert_eq<T: PartialEq + Debug>(&mut self, left: T, right: T) -> Result<()> {
        let args = vec![format!("{left:?}"), format!("{right:?}")];
        self.wrapper("assert_eq").invoke(args, || {
            if left == right {
                Ok(())
            } else {
                Err(CorralError::check(format!("{left:?} != {right:?}")))
            }
        })
    }

    pub fn assert_ne<T: PartialEq + Debug>(&mut self, left: T, right: T) -> Result<()> {
        let args = vec![format!("{left:?}"), format!("{right:?}")];
        self.wrapper("assert_ne").invoke(args, || {
            if left != right {
                Ok(())
            } else {
                Err(CorralError::check(format!("both sides are {left:?}")))
            }
        })
    }

    /// Check the row count of `table` as seen by `session`. A session fault
    /// surfaces as an `error`-status call, not a failure.
    pub fn assert_row_count(
        &mut self,
        session: &dyn Session,
        table: &str,
        expected: usize,
    ) -> Result<()> {
        let args = vec![table.to_string(), expected.to_string()];
        self.wrapper("assert_row_count").invoke(args, || {
            let actual = session.count(table)?;
            if actual == expected {
                Ok(())
            } else {
                Err(CorralError::check(format!(
                    "table '{table}' has {actual} rows, expected {expected}"
                )))
            }
        })
    }

    /// The call log of one instrumented method.
    pub fn calls(&self, name: &str) -> &[Call] {
        self.wrappers.get(name).map_or(&[], AssertWrapper::calls)
    }

    /// All recorded calls across methods, oldest first.
    pub fn all_calls(&self) -> Vec<Call> {
        let mut calls: Vec<Call> = self
            .wrappers
            .values()
            .flat_map(|w| w.calls().iter().cloned())
            .collect();
        calls.sort_by_key(|call| call.timestamp);
        calls
    }
}
