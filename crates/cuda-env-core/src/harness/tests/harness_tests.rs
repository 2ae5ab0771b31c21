use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::RecordingSink;
use crate::config::HarnessConfig;
use crate::device::MockDeviceQuery;
use crate::harness::{Harness, TestStatus};
use crate::kernel::constants::{EXIT_FAILURE, EXIT_SUCCESS};
use crate::library_test::tests::{Behaviour, ScriptedTest};
use crate::library_test::{LibraryTest, LifecycleOptions, Phase, TestRegistry};

type CallLog = Arc<Mutex<Vec<Phase>>>;

/// Register a scripted test under `key`, returning the log of its phase calls.
fn register_scripted(
    registry: &mut TestRegistry,
    key: &'static str,
    script: Option<(Phase, Behaviour)>,
) -> CallLog {
    let calls: CallLog = Arc::new(Mutex::new(Vec::new()));
    let shared = calls.clone();
    registry
        .register_factory(key, move || {
            let mut test = ScriptedTest {
                calls: shared.clone(),
                ..ScriptedTest::passing(key)
            };
            if let Some((phase, behaviour)) = script {
                test = test.with(phase, behaviour);
            }
            Ok(Box::new(test) as Box<dyn LibraryTest>)
        })
        .expect("registration should succeed");
    calls
}

fn mock_harness(registry: TestRegistry) -> Harness {
    Harness::new(Box::new(MockDeviceQuery::builtin()), registry)
}

#[tokio::test]
async fn test_all_passing_run_exits_zero() {
    let mut registry = TestRegistry::new();
    register_scripted(&mut registry, "BetaTest", None);
    register_scripted(&mut registry, "AlphaTest", None);

    let harness = mock_harness(registry);
    let mut sink = RecordingSink::default();
    let summary = harness.run(&mut sink).await.expect("run should complete");

    assert!(summary.is_success());
    assert_eq!(summary.exit_code(), EXIT_SUCCESS);
    assert_eq!(summary.device_count, 2);
    assert_eq!(
        sink.events,
        vec![
            "begin",
            "count mock 2",
            "device 0 Mock RTX 4090",
            "device 1 Mock A100",
            "enumeration_complete",
            "started AlphaTest",
            "finished AlphaTest passed",
            "started BetaTest",
            "finished BetaTest passed",
            "finish 0",
        ]
    );
}

#[tokio::test]
async fn test_failing_test_does_not_stop_the_next_one() {
    let mut registry = TestRegistry::new();
    let first = register_scripted(&mut registry, "ATest", None);
    let second = register_scripted(&mut registry, "BTest", Some((Phase::ExecuteTests, Behaviour::Fail)));
    let third = register_scripted(&mut registry, "CTest", None);

    let harness = mock_harness(registry);
    let summary = harness
        .run(&mut RecordingSink::default())
        .await
        .expect("run should complete");

    let statuses: Vec<TestStatus> = summary.tests.iter().map(|t| t.status).collect();
    assert_eq!(statuses, vec![TestStatus::Passed, TestStatus::Failed, TestStatus::Passed]);
    assert_eq!(*first.lock().unwrap(), Phase::ORDERED.to_vec());
    assert_eq!(*second.lock().unwrap(), Phase::ORDERED.to_vec());
    assert_eq!(*third.lock().unwrap(), Phase::ORDERED.to_vec());

    let failed = &summary.tests[1];
    assert_eq!(failed.key, "BTest");
    assert!(failed.error.as_deref().unwrap().contains("ExecuteTests"));
    assert!(failed.cleanup_error.is_none());
    assert_eq!(summary.exit_code(), EXIT_FAILURE);
}

#[tokio::test]
async fn test_cleanup_only_failure_is_a_failure() {
    let mut registry = TestRegistry::new();
    register_scripted(&mut registry, "ATest", Some((Phase::Cleanup, Behaviour::Fail)));

    let summary = mock_harness(registry)
        .run(&mut RecordingSink::default())
        .await
        .expect("run should complete");

    assert_eq!(summary.tests[0].status, TestStatus::CleanupFailed);
    assert!(summary.tests[0].error.is_none());
    assert!(summary.tests[0].cleanup_error.is_some());
    assert_eq!(summary.exit_code(), EXIT_FAILURE);
}

#[tokio::test]
async fn test_discovery_errors_are_skipped_and_reported() {
    let mut registry = TestRegistry::new();
    register_scripted(&mut registry, "AlphaTest", None);
    registry
        .register_factory("BrokenTest", || Err("missing resource".to_string()))
        .unwrap();
    registry
        .register_factory("PanickyTest", || panic!("constructor exploded"))
        .unwrap();
    let last = register_scripted(&mut registry, "ZetaTest", None);

    let harness = mock_harness(registry);
    let mut sink = RecordingSink::default();
    let summary = harness.run(&mut sink).await.expect("run should complete");

    assert_eq!(summary.tests.len(), 2);
    let skipped: Vec<&str> = summary.discovery_errors.iter().map(|d| d.key.as_str()).collect();
    assert_eq!(skipped, vec!["BrokenTest", "PanickyTest"]);
    assert_eq!(last.lock().unwrap().len(), 4);
    assert!(sink.events.contains(&"discovery_error BrokenTest".to_string()));
    assert_eq!(summary.exit_code(), EXIT_FAILURE);
}

#[tokio::test]
async fn test_enumeration_failure_ends_the_run_early() {
    let built = Arc::new(AtomicUsize::new(0));
    let counter = built.clone();
    let mut registry = TestRegistry::new();
    registry
        .register_factory("AlphaTest", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(ScriptedTest::passing("Alpha")) as Box<dyn LibraryTest>)
        })
        .unwrap();

    let query = MockDeviceQuery::builtin().failing_count("driver not loaded");
    let harness = Harness::new(Box::new(query), registry);
    let mut sink = RecordingSink::default();
    let summary = harness.run(&mut sink).await.expect("run should complete");

    assert!(summary.aborted);
    assert!(summary.tests.is_empty());
    assert_eq!(built.load(Ordering::SeqCst), 0);
    assert!(summary.enumeration_error.as_deref().unwrap().contains("driver not loaded"));
    assert_eq!(sink.events, vec!["begin", "enumeration_error", "finish 1"]);
    assert_eq!(summary.exit_code(), EXIT_FAILURE);
}

#[tokio::test]
async fn test_enumeration_failure_can_be_continued_past() {
    let mut registry = TestRegistry::new();
    let calls = register_scripted(&mut registry, "AlphaTest", None);

    let query = MockDeviceQuery::builtin().failing_count("driver not loaded");
    let harness = Harness::new(Box::new(query), registry).continue_on_enumeration_failure(true);
    let summary = harness
        .run(&mut RecordingSink::default())
        .await
        .expect("run should complete");

    assert!(!summary.aborted);
    assert_eq!(summary.tests.len(), 1);
    assert_eq!(calls.lock().unwrap().len(), 4);
    // The enumeration failure still fails the run.
    assert_eq!(summary.exit_code(), EXIT_FAILURE);
}

#[tokio::test]
async fn test_device_failure_fails_the_run_but_tests_still_run() {
    let mut registry = TestRegistry::new();
    register_scripted(&mut registry, "AlphaTest", None);

    let query = MockDeviceQuery::builtin().failing_describe(0);
    let summary = Harness::new(Box::new(query), registry)
        .run(&mut RecordingSink::default())
        .await
        .expect("run should complete");

    assert_eq!(summary.reported_devices(), 1);
    assert_eq!(summary.passed(), 1);
    assert_eq!(summary.exit_code(), EXIT_FAILURE);
}

#[tokio::test]
async fn test_phase_timeout_from_config() {
    let mut registry = TestRegistry::new();
    let calls = register_scripted(
        &mut registry,
        "SlowTest",
        Some((Phase::Initialize, Behaviour::Sleep(Duration::from_secs(30)))),
    );

    let harness = Harness::from_config(
        &HarnessConfig::default(),
        Box::new(MockDeviceQuery::builtin()),
        registry,
    )
    .with_options(LifecycleOptions::with_phase_timeout(Duration::from_millis(20)));
    let summary = harness
        .run(&mut RecordingSink::default())
        .await
        .expect("run should complete");

    assert_eq!(summary.tests[0].status, TestStatus::Failed);
    assert!(summary.tests[0].error.as_deref().unwrap().contains("timed out"));
    assert_eq!(*calls.lock().unwrap(), vec![Phase::Initialize, Phase::Cleanup]);
}

#[tokio::test]
async fn test_empty_registry_runs_enumeration_only() {
    let summary = mock_harness(TestRegistry::new())
        .run(&mut RecordingSink::default())
        .await
        .expect("run should complete");

    assert!(summary.tests.is_empty());
    assert!(summary.is_success());
}

#[test]
fn test_devices_command_runs_no_tests() {
    let mut registry = TestRegistry::new();
    let calls = register_scripted(&mut registry, "AlphaTest", None);

    let mut sink = RecordingSink::default();
    let summary = mock_harness(registry).devices(&mut sink).expect("devices should complete");

    assert_eq!(summary.device_count, 2);
    assert!(calls.lock().unwrap().is_empty());
    assert_eq!(sink.events.last().map(String::as_str), Some("finish 0"));
}

#[test]
fn test_list_reports_descriptors_in_order_without_running_phases() {
    let mut registry = TestRegistry::new();
    let calls = register_scripted(&mut registry, "ZetaTest", None);
    register_scripted(&mut registry, "AlphaTest", None);
    registry
        .register_factory("BrokenTest", || Err("missing resource".to_string()))
        .unwrap();

    let mut sink = RecordingSink::default();
    let listing = mock_harness(registry).list(&mut sink).expect("list should complete");

    let keys: Vec<&str> = listing.iter().map(|l| l.key.as_str()).collect();
    assert_eq!(keys, vec!["AlphaTest", "BrokenTest", "ZetaTest"]);
    assert_eq!(listing[0].descriptor.as_ref().map(|d| d.version.as_str()), Some("1.0.0"));
    assert!(listing[1].descriptor.is_none());
    assert!(listing[1].error.is_some());
    assert!(calls.lock().unwrap().is_empty());
    assert_eq!(sink.events, vec!["listing 3"]);
}
