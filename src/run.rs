//! Pipeline processors and dispatch.
//!
//! Two kinds of processing unit exist: a [`Loader`] ingests records from an
//! external source, a [`Step`] transforms records already in the store. Both
//! run under the same setup → body → teardown envelope; teardown always runs
//! and the body's error wins.
//!
//! [`Scope`] is the tagged union a test unit binds to, and [`scope_process`]
//! routes it exhaustively to exactly one execution routine.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::db::Session;
use crate::errors::Result;

/// Shared handle to a processor. Processors mutate themselves while running,
/// and the same instance is referenced by both the registry and the scope.
pub type SharedLoader = Arc<Mutex<dyn Loader + Send>>;
pub type SharedStep = Arc<Mutex<dyn Step + Send>>;

// =============================================================================
// PROCESSOR TRAITS
// =============================================================================

/// A processing unit that ingests records from an external source.
pub trait Loader {
    fn name(&self) -> &str;

    /// Override point; runs before `generate`.
    fn setup(&mut self, _session: &mut dyn Session) -> Result<()> {
        Ok(())
    }

    /// Collect records and stage them into the session.
    fn generate(&mut self, session: &mut dyn Session) -> Result<()>;

    /// Override point; runs after `generate`, even when it failed.
    fn teardown(&mut self, _session: &mut dyn Session) -> Result<()> {
        Ok(())
    }
}

/// A processing unit that transforms already-ingested records.
pub trait Step {
    fn name(&self) -> &str;

    fn setup(&mut self, _session: &mut dyn Session) -> Result<()> {
        Ok(())
    }

    /// Transform staged/committed records through the session.
    fn process(&mut self, session: &mut dyn Session) -> Result<()>;

    fn teardown(&mut self, _session: &mut dyn Session) -> Result<()> {
        Ok(())
    }
}

// =============================================================================
// EXECUTION ROUTINES
// =============================================================================

/// Run one loader under the setup/teardown envelope.
pub fn execute_loader(loader: &mut dyn Loader, session: &mut dyn Session) -> Result<()> {
    debug!(unit = loader.name(), "executing loader");
    loader.setup(session)?;
    let body = loader.generate(session);
    let teardown = loader.teardown(session);
    body.and(teardown)
}

/// Run one step under the setup/teardown envelope.
pub fn execute_step(step: &mut dyn Step, session: &mut dyn Session) -> Result<()> {
    debug!(unit = step.name(), "executing step");
    step.setup(session)?;
    let body = step.process(session);
    let teardown = step.teardown(session);
    body.and(teardown)
}

// =============================================================================
// SCOPE
// =============================================================================

/// The bound processing entity a test unit exercises.
#[derive(Clone)]
pub enum Scope {
    Loader(SharedLoader),
    Step(SharedStep),
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Loader(_) => f.debug_tuple("Loader").field(&self.name()).finish(),
            Scope::Step(_) => f.debug_tuple("Step").field(&self.name()).finish(),
        }
    }
}

impl Scope {
    pub fn loader<L: Loader + Send + 'static>(loader: L) -> Self {
        Scope::Loader(Arc::new(Mutex::new(loader)))
    }

    pub fn step<S: Step + Send + 'static>(step: S) -> Self {
        Scope::Step(Arc::new(Mutex::new(step)))
    }

    pub fn name(&self) -> String {
        match self {
            Scope::Loader(l) => l.lock().name().to_string(),
            Scope::Step(s) => s.lock().name().to_string(),
        }
    }

    /// Human-readable variant tag, used in configuration errors and reports.
    pub fn variant(&self) -> &'static str {
        match self {
            Scope::Loader(_) => "Loader",
            Scope::Step(_) => "Step",
        }
    }
}

/// Dispatch a scope for processing against the given session.
///
/// A `Loader` scope reaches only the loader routine, a `Step` scope only the
/// step routine; the match is exhaustive so there is no fallthrough path.
pub fn scope_process(scope: &Scope, session: &mut dyn Session) -> Result<()> {
    match scope {
        Scope::Loader(loader) => execute_loader(&mut *loader.lock(), session),
        Scope::Step(step) => execute_step(&mut *step.lock(), session),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryFactory, MemoryStore, SessionFactory};
    use crate::errors::CorralError;
    use serde_json::json;

    struct FlagLoader {
        ran: Arc<Mutex<bool>>,
        fail: bool,
        torn_down: Arc<Mutex<bool>>,
    }

    impl Loader for FlagLoader {
        fn name(&self) -> &str {
            "flag_loader"
        }
        fn generate(&mut self, session: &mut dyn Session) -> Result<()> {
            *self.ran.lock() = true;
            session.insert("raw", json!({"src": "flag"}))?;
            if self.fail {
                return Err(CorralError::pipeline(self.name(), "generate failed"));
            }
            Ok(())
        }
        fn teardown(&mut self, _session: &mut dyn Session) -> Result<()> {
            *self.torn_down.lock() = true;
            Ok(())
        }
    }

    struct FlagStep {
        ran: Arc<Mutex<bool>>,
    }

    impl Step for FlagStep {
        fn name(&self) -> &str {
            "flag_step"
        }
        fn process(&mut self, _session: &mut dyn Session) -> Result<()> {
            *self.ran.lock() = true;
            Ok(())
        }
    }

    fn flags() -> (Arc<Mutex<bool>>, Arc<Mutex<bool>>) {
        (Arc::new(Mutex::new(false)), Arc::new(Mutex::new(false)))
    }

    #[test]
    fn loader_scope_reaches_only_the_loader_routine() {
        let (loader_ran, torn_down) = flags();
        let step_ran = Arc::new(Mutex::new(false));
        let scope = Scope::loader(FlagLoader {
            ran: Arc::clone(&loader_ran),
            fail: false,
            torn_down,
        });
        let other = Scope::step(FlagStep {
            ran: Arc::clone(&step_ran),
        });

        let factory = MemoryFactory::new(MemoryStore::new());
        let mut session = factory.session().unwrap();
        scope_process(&scope, session.as_mut()).unwrap();

        assert!(*loader_ran.lock());
        assert!(!*step_ran.lock());
        assert_eq!(other.variant(), "Step");
        assert_eq!(scope.variant(), "Loader");
    }

    #[test]
    fn step_scope_reaches_only_the_step_routine() {
        let step_ran = Arc::new(Mutex::new(false));
        let scope = Scope::step(FlagStep {
            ran: Arc::clone(&step_ran),
        });

        let factory = MemoryFactory::new(MemoryStore::new());
        let mut session = factory.session().unwrap();
        scope_process(&scope, session.as_mut()).unwrap();
        assert!(*step_ran.lock());
    }

    #[test]
    fn teardown_runs_when_the_body_fails_and_body_error_wins() {
        let (ran, torn_down) = flags();
        let scope = Scope::loader(FlagLoader {
            ran,
            fail: true,
            torn_down: Arc::clone(&torn_down),
        });

        let factory = MemoryFactory::new(MemoryStore::new());
        let mut session = factory.session().unwrap();
        let err = scope_process(&scope, session.as_mut()).unwrap_err();

        assert!(*torn_down.lock());
        assert!(matches!(err, CorralError::Pipeline { .. }));
    }
}
