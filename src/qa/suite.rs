//! Module registry, discovery, and suite execution.
//!
//! A [`TestModule`] is the Rust rendition of "a loaded module": an ordered
//! registry of named processors plus test-unit constructors. Discovery walks
//! the registry lazily and restartably; [`run_tests`] resolves each unit's
//! scope, runs its lifecycle, classifies the outcome, and aggregates one
//! [`SuiteReport`] for the caller.

use tracing::debug;

use crate::config::RunnerConfig;
use crate::db::SessionFactory;
use crate::errors::{CorralError, Result};
use crate::qa::asserter::Asserter;
use crate::qa::case::{run_case, TestCase};
use crate::qa::collector::Call;
use crate::run::{Loader, Scope, Step};

// Color constants for terminal output
const RESET: &str = "\x1b[0m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";

// =============================================================================
// MODULE REGISTRY
// =============================================================================

type CaseConstructor = Box<dyn Fn() -> Box<dyn TestCase>>;

/// One discovered test entry: a named constructor, so the same module can be
/// enumerated any number of times with a fresh unit instance per run.
pub struct TestEntry {
    name: String,
    build: CaseConstructor,
}

impl TestEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instantiate(&self) -> Box<dyn TestCase> {
        (self.build)()
    }
}

/// The unit-under-test namespace for one suite invocation: named processors
/// and the test units that exercise them, in registration order.
#[derive(Default)]
pub struct TestModule {
    scopes: Vec<(String, Scope)>,
    cases: Vec<TestEntry>,
}

impl TestModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_loader<L: Loader + Send + 'static>(&mut self, loader: L) -> &mut Self {
        let scope = Scope::loader(loader);
        self.scopes.push((scope.name(), scope));
        self
    }

    pub fn register_step<S: Step + Send + 'static>(&mut self, step: S) -> &mut Self {
        let scope = Scope::step(step);
        self.scopes.push((scope.name(), scope));
        self
    }

    pub fn register_case<C, F>(&mut self, name: impl Into<String>, build: F) -> &mut Self
    where
        C: TestCase + 'static,
        F: Fn() -> C + 'static,
    {
        self.cases.push(TestEntry {
            name: name.into(),
            build: Box::new(move || Box::new(build())),
        });
        self
    }

    /// Resolve a unit's declared scope target to a registered processor.
    ///
    /// Anything that does not name a registered Loader or Step is a fatal
    /// configuration error; neither execution routine is reached.
    pub fn resolve_scope(&self, target: &str) -> Result<Scope> {
        self.scopes
            .iter()
            .find(|(name, _)| name == target)
            .map(|(_, scope)| scope.clone())
            .ok_or_else(|| {
                CorralError::improperly_configured(format!(
                    "scope must name a registered 'Loader' or 'Step'; found: '{target}'"
                ))
            })
    }
}

/// Lazy, finite, restartable enumeration of a module's test entries, in
/// registration order. Call again for a fresh iterator.
pub fn test_cases_from_module(module: &TestModule) -> impl Iterator<Item = &TestEntry> {
    module.cases.iter()
}

// =============================================================================
// SUITE RESULTS
// =============================================================================

/// Terminal state of one executed unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseStatus {
    Pass,
    Fail,
    Error,
    Skipped,
}

/// One unit's outcome, with the full assertion-call detail captured during
/// its run.
pub struct CaseOutcome {
    pub name: String,
    pub status: CaseStatus,
    pub detail: Option<String>,
    pub calls: Vec<Call>,
}

/// Aggregate result of one suite invocation. Read-only once produced.
#[derive(Default)]
pub struct SuiteReport {
    pub outcomes: Vec<CaseOutcome>,
}

impl SuiteReport {
    pub fn executed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status != CaseStatus::Skipped)
            .count()
    }

    pub fn passed(&self) -> usize {
        self.count(CaseStatus::Pass)
    }

    pub fn failures(&self) -> usize {
        self.count(CaseStatus::Fail)
    }

    pub fn errors(&self) -> usize {
        self.count(CaseStatus::Error)
    }

    pub fn skipped(&self) -> usize {
        self.count(CaseStatus::Skipped)
    }

    pub fn success(&self) -> bool {
        self.failures() == 0 && self.errors() == 0
    }

    fn count(&self, status: CaseStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}

// =============================================================================
// SUITE EXECUTION
// =============================================================================

/// Run every discovered unit of `module` and aggregate one report.
///
/// Units run strictly sequentially, each inside its own scoped session, so
/// one unit's failure never leaks transaction state into the next. With
/// `failfast` set, the suite stops after the first failure or error.
pub fn run_tests(
    module: &TestModule,
    factory: &dyn SessionFactory,
    config: &RunnerConfig,
) -> SuiteReport {
    let mut report = SuiteReport::default();

    for entry in test_cases_from_module(module) {
        let mut case = entry.instantiate();

        if let Some(reason) = case.skip() {
            debug!(unit = entry.name(), reason, "skipping unit");
            let outcome = CaseOutcome {
                name: entry.name().to_string(),
                status: CaseStatus::Skipped,
                detail: Some(reason.to_string()),
                calls: Vec::new(),
            };
            print_outcome(&outcome, config);
            report.outcomes.push(outcome);
            continue;
        }

        let mut check = Asserter::new();
        let run = module
            .resolve_scope(case.scope())
            .and_then(|scope| run_case(case.as_mut(), &scope, factory, &mut check));

        let (status, detail) = match run {
            Ok(()) => (CaseStatus::Pass, None),
            Err(err) if err.is_check_failure() => (CaseStatus::Fail, Some(err.to_string())),
            Err(err) => (CaseStatus::Error, Some(err.to_string())),
        };

        let outcome = CaseOutcome {
            name: entry.name().to_string(),
            status,
            detail,
            calls: check.all_calls(),
        };
        print_outcome(&outcome, config);
        let stop = config.failfast && matches!(status, CaseStatus::Fail | CaseStatus::Error);
        report.outcomes.push(outcome);
        if stop {
            break;
        }
    }

    print_summary(&report, config);
    report
}

// =============================================================================
// REPORTING
// =============================================================================

fn colorize(text: &str, color: &str, config: &RunnerConfig) -> String {
    if config.use_colors {
        format!("{color}{text}{RESET}")
    } else {
        text.to_string()
    }
}

fn print_outcome(outcome: &CaseOutcome, config: &RunnerConfig) {
    if config.verbosity == 0 {
        return;
    }
    match outcome.status {
        CaseStatus::Pass => {
            eprintln!("{}: {}", colorize("PASS", GREEN, config), outcome.name)
        }
        CaseStatus::Fail => {
            eprintln!("{}: {}", colorize("FAIL", RED, config), outcome.name);
            if let Some(detail) = &outcome.detail {
                eprintln!("  {detail}");
            }
        }
        CaseStatus::Error => {
            eprintln!("{}: {}", colorize("ERROR", RED, config), outcome.name);
            if let Some(detail) = &outcome.detail {
                eprintln!("  {detail}");
            }
        }
        CaseStatus::Skipped => {
            let reason = outcome.detail.as_deref().unwrap_or("");
            eprintln!(
                "{}: {} ({reason})",
                colorize("SKIP", YELLOW, config),
                outcome.name
            );
        }
    }
    if config.verbosity >= 2 {
        for call in &outcome.calls {
            eprintln!(
                "    {} {}({}) -> {}",
                call.timestamp.format("%H:%M:%S%.3f"),
                call.name,
                call.args.join(", "),
                call.status.as_str()
            );
        }
    }
}

fn print_summary(report: &SuiteReport, config: &RunnerConfig) {
    eprintln!(
        "\nSuite summary: ran {}, {} {}, {} {}, {} {}, skipped {}",
        report.executed(),
        colorize("passed", GREEN, config),
        report.passed(),
        colorize("failed", RED, config),
        report.failures(),
        colorize("errored", RED, config),
        report.errors(),
        report.skipped(),
    );
}
