//! Test units and the four-phase execution lifecycle.
//!
//! A [`TestCase`] binds exactly one scope (a Loader or a Step, by name) and
//! supplies the validation phases around it. [`run_case`] executes the whole
//! lifecycle inside one scoped session:
//!
//! ```text
//! created -> setup -> pre_validate -> processing -> post_validate
//!         -> terminal(pass | fail | error)
//! ```
//!
//! The first phase to raise ends the run; the scoped session rolls back and
//! the error propagates. There is no retry.

use tracing::debug;

use crate::db::{session_scope, Session, SessionFactory};
use crate::errors::Result;
use crate::qa::asserter::Asserter;
use crate::run::{scope_process, Scope};

/// A user-defined QA unit exercising one pipeline processor.
///
/// `setup` is an optional override point; `pre_validate` and `post_validate`
/// have no default body and must be implemented by the concrete unit.
pub trait TestCase {
    fn name(&self) -> &str;

    /// The name of the processor this unit exercises. Resolved against the
    /// owning module's registry; resolution to something other than a Loader
    /// or a Step is a fatal configuration error.
    fn scope(&self) -> &str;

    /// When set, the unit contributes no tests and is skipped with the given
    /// reason instead of being run.
    fn skip(&self) -> Option<&str> {
        None
    }

    fn setup(&mut self, _session: &mut dyn Session, _check: &mut Asserter) -> Result<()> {
        Ok(())
    }

    /// Validate the world before the scope runs.
    fn pre_validate(&mut self, session: &mut dyn Session, check: &mut Asserter) -> Result<()>;

    /// Validate the world after the scope ran.
    fn post_validate(&mut self, session: &mut dyn Session, check: &mut Asserter) -> Result<()>;
}

/// Run one unit's full lifecycle inside a single scoped session.
///
/// The scope is bound to the same session as the validation phases, so the
/// unit observes exactly the transaction its processor wrote into. Any phase
/// error aborts the rest, after which [`session_scope`] rolls back.
pub fn run_case(
    case: &mut dyn TestCase,
    scope: &Scope,
    factory: &dyn SessionFactory,
    check: &mut Asserter,
) -> Result<()> {
    debug!(unit = case.name(), scope = %scope.name(), "running test case");
    session_scope(factory, |session| {
        case.setup(session, check)?;
        case.pre_validate(session, check)?;
        scope_process(scope, session)?;
        case.post_validate(session, check)
    })
}
