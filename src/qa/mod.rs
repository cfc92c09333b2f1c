//! The QA harness: assertion collection, test-unit lifecycle, and suite
//! execution for pipeline processors.

pub mod asserter;
pub mod case;
pub mod collector;
pub mod suite;

pub use asserter::{Asserter, ASSERT_METHODS};
pub use case::{run_case, TestCase};
pub use collector::{AssertWrapper, Call, CallStatus};
pub use suite::{
    run_tests, test_cases_from_module, CaseOutcome, CaseStatus, SuiteReport, TestEntry, TestModule,
};
