//! End-to-end suite behavior: a small ingest/normalize pipeline exercised
//! through the QA harness.

use corral::config::RunnerConfig;
use corral::db::{MemoryFactory, MemoryStore, Session};
use corral::qa::{run_tests, Asserter, CallStatus, CaseStatus, TestCase, TestModule};
use corral::run::{Loader, Step};
use corral::Result;
use serde_json::json;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("corral=debug")
        .try_init();
}

fn quiet() -> RunnerConfig {
    RunnerConfig {
        verbosity: 0,
        failfast: false,
        use_colors: false,
    }
}

// =============================================================================
// PIPELINE UNDER TEST
// =============================================================================

/// Ingests three raw sensor readings.
struct SensorIngest;

impl Loader for SensorIngest {
    fn name(&self) -> &str {
        "sensor_ingest"
    }
    fn generate(&mut self, session: &mut dyn Session) -> Result<()> {
        for (id, value) in [(1, 20.5), (2, 21.0), (3, 19.8)] {
            session.insert("raw", json!({"id": id, "celsius": value}))?;
        }
        Ok(())
    }
}

/// Converts ingested readings to Fahrenheit.
struct Normalize;

impl Step for Normalize {
    fn name(&self) -> &str {
        "normalize"
    }
    fn process(&mut self, session: &mut dyn Session) -> Result<()> {
        for row in session.rows("raw")? {
            let celsius = row["celsius"].as_f64().unwrap_or(0.0);
            session.insert(
                "clean",
                json!({"id": row["id"], "fahrenheit": celsius * 9.0 / 5.0 + 32.0}),
            )?;
        }
        Ok(())
    }
}

// =============================================================================
// TEST UNITS
// =============================================================================

struct IngestCase;

impl TestCase for IngestCase {
    fn name(&self) -> &str {
        "ingest_case"
    }
    fn scope(&self) -> &str {
        "sensor_ingest"
    }
    fn pre_validate(&mut self, session: &mut dyn Session, check: &mut Asserter) -> Result<()> {
        check.assert_row_count(session, "raw", 0)
    }
    fn post_validate(&mut self, session: &mut dyn Session, check: &mut Asserter) -> Result<()> {
        check.assert_row_count(session, "raw", 3)?;
        check.assert_true("all rows carry a reading", {
            session.rows("raw")?.iter().all(|r| r["celsius"].is_f64())
        })
    }
}

struct NormalizeCase;

impl TestCase for NormalizeCase {
    fn name(&self) -> &str {
        "normalize_case"
    }
    fn scope(&self) -> &str {
        "normalize"
    }
    fn pre_validate(&mut self, session: &mut dyn Session, check: &mut Asserter) -> Result<()> {
        check.assert_row_count(session, "raw", 3)
    }
    fn post_validate(&mut self, session: &mut dyn Session, check: &mut Asserter) -> Result<()> {
        check.assert_row_count(session, "clean", 3)?;
        let first = &session.rows("clean")?[0];
        let fahrenheit = first["fahrenheit"].as_f64().unwrap_or(f64::NAN);
        check.assert_true(
            "first reading converts to 68.9F",
            (fahrenheit - 68.9).abs() < 1e-9,
        )
    }
}

/// Post-validation always observes a mismatch.
struct AlwaysFailsCase;

impl TestCase for AlwaysFailsCase {
    fn name(&self) -> &str {
        "always_fails"
    }
    fn scope(&self) -> &str {
        "sensor_ingest"
    }
    fn pre_validate(&mut self, _session: &mut dyn Session, check: &mut Asserter) -> Result<()> {
        check.assert_true("anything", true)
    }
    fn post_validate(&mut self, session: &mut dyn Session, check: &mut Asserter) -> Result<()> {
        check.assert_row_count(session, "raw", 999)
    }
}

// =============================================================================
// SUITE PROPERTIES
// =============================================================================

#[test]
fn green_pipeline_reports_all_passed() {
    init_tracing();
    let mut module = TestModule::new();
    module.register_loader(SensorIngest);
    module.register_step(Normalize);
    module.register_case("ingest_case", || IngestCase);
    module.register_case("normalize_case", || NormalizeCase);

    let factory = MemoryFactory::new(MemoryStore::new());
    let report = run_tests(&module, &factory, &quiet());

    assert_eq!(report.executed(), 2);
    assert_eq!(report.failures(), 0);
    assert_eq!(report.errors(), 0);
    assert!(report.success());

    // The normalize unit committed its transformed rows.
    assert_eq!(factory.store().count("clean"), 3);
}

#[test]
fn one_pass_one_fail_zero_error() {
    let mut module = TestModule::new();
    module.register_loader(SensorIngest);
    module.register_case("ingest_case", || IngestCase);
    module.register_case("always_fails", || AlwaysFailsCase);

    let factory = MemoryFactory::new(MemoryStore::new());
    let report = run_tests(&module, &factory, &quiet());

    assert_eq!(report.passed(), 1);
    assert_eq!(report.failures(), 1);
    assert_eq!(report.errors(), 0);
    assert!(!report.success());
}

#[test]
fn failfast_aborts_before_later_units() {
    let mut module = TestModule::new();
    module.register_loader(SensorIngest);
    module.register_case("always_fails", || AlwaysFailsCase);
    module.register_case("ingest_case", || IngestCase);

    let factory = MemoryFactory::new(MemoryStore::new());
    let config = RunnerConfig {
        failfast: true,
        ..quiet()
    };
    let report = run_tests(&module, &factory, &config);

    assert_eq!(report.executed(), 1);
    assert_eq!(report.outcomes[0].name, "always_fails");
    assert_eq!(report.failures(), 1);
    // The failed unit rolled back; nothing reached the store.
    assert_eq!(factory.store().count("raw"), 0);
}

#[test]
fn failed_unit_leaves_no_state_for_the_next() {
    let mut module = TestModule::new();
    module.register_loader(SensorIngest);
    module.register_case("always_fails", || AlwaysFailsCase);
    module.register_case("ingest_case", || IngestCase);

    let factory = MemoryFactory::new(MemoryStore::new());
    let report = run_tests(&module, &factory, &quiet());

    // ingest_case still sees an empty store in pre_validate and passes.
    assert_eq!(report.failures(), 1);
    assert_eq!(report.passed(), 1);
}

#[test]
fn report_carries_per_call_detail() {
    let mut module = TestModule::new();
    module.register_loader(SensorIngest);
    module.register_case("always_fails", || AlwaysFailsCase);

    let factory = MemoryFactory::new(MemoryStore::new());
    let report = run_tests(&module, &factory, &quiet());

    let outcome = &report.outcomes[0];
    assert_eq!(outcome.status, CaseStatus::Fail);
    // One pass from pre_validate, one fail from post_validate.
    let statuses: Vec<_> = outcome.calls.iter().map(|c| c.status).collect();
    assert_eq!(statuses, vec![CallStatus::Pass, CallStatus::Fail]);
    assert_eq!(outcome.calls[1].name, "assert_row_count");
    assert_eq!(
        outcome.calls[1].args,
        vec!["raw".to_string(), "999".to_string()]
    );
}
