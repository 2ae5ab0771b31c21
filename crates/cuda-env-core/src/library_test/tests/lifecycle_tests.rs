// crates/cuda-env-core/src/library_test/tests/lifecycle_tests.rs
#![cfg(test)]

use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use futures::FutureExt;

use super::{Behaviour, ScriptedTest};
use crate::kernel::constants::TEMPLATE_VERSION;
use crate::library_test::error::LifecycleError;
use crate::library_test::lifecycle::{run_blocking, run_test, ExecutionOutcome, LifecycleOptions};
use crate::library_test::traits::Phase;

fn cleanup_count(calls: &[Phase]) -> usize {
    calls.iter().filter(|p| **p == Phase::Cleanup).count()
}

#[tokio::test]
async fn test_all_phases_run_in_order_on_success() {
    let mut test = ScriptedTest::passing("cuDNN");
    let calls = test.calls();

    let run = run_test(&mut test, &LifecycleOptions::default()).await;

    assert!(run.is_success());
    assert_eq!(*calls.lock().unwrap(), Phase::ORDERED.to_vec());
    assert_eq!(run.invoked_phases(), Phase::ORDERED.to_vec());
    assert!(run.phases.iter().all(|record| record.passed));
    assert_eq!(run.descriptor.name, "cuDNN");
    assert_eq!(run.descriptor.version, "1.0.0");
    assert_eq!(run.template_version, TEMPLATE_VERSION);
    assert!(run.into_result().is_ok());
}

#[tokio::test]
async fn test_cleanup_runs_exactly_once_whatever_fails() {
    let scripts = [
        (Phase::Initialize, Behaviour::Fail),
        (Phase::VerifyVersion, Behaviour::Fail),
        (Phase::ExecuteTests, Behaviour::Fail),
        (Phase::Cleanup, Behaviour::Fail),
        (Phase::Initialize, Behaviour::Pass),
    ];

    for (phase, behaviour) in scripts {
        let mut test = ScriptedTest::passing("scripted").with(phase, behaviour);
        let calls = test.calls();
        let _ = run_test(&mut test, &LifecycleOptions::default()).await;
        let calls = calls.lock().unwrap();
        assert_eq!(cleanup_count(&calls), 1, "cleanup count for {:?} {:?}", phase, behaviour);
        assert_eq!(calls.last(), Some(&Phase::Cleanup));
    }
}

#[tokio::test]
async fn test_initialize_failure_skips_to_cleanup_and_propagates() {
    let mut test = ScriptedTest::passing("cuDNN").with(Phase::Initialize, Behaviour::Fail);
    let calls = test.calls();

    let run = run_test(&mut test, &LifecycleOptions::default()).await;

    assert_eq!(*calls.lock().unwrap(), vec![Phase::Initialize, Phase::Cleanup]);
    assert!(!run.is_success());
    let err = run.into_result().expect_err("initialize failure must propagate");
    assert_eq!(err.phase(), Phase::Initialize);
    assert_eq!(err.test_name(), "cuDNN");
    assert!(err.to_string().contains("Initialize failed on purpose"));
}

#[tokio::test]
async fn test_verify_version_failure_skips_execute() {
    let mut test = ScriptedTest::passing("cuBLAS").with(Phase::VerifyVersion, Behaviour::Fail);
    let calls = test.calls();

    let run = run_test(&mut test, &LifecycleOptions::default()).await;

    assert_eq!(
        *calls.lock().unwrap(),
        vec![Phase::Initialize, Phase::VerifyVersion, Phase::Cleanup]
    );
    assert_eq!(run.outcome.primary_error().map(|e| e.phase()), Some(Phase::VerifyVersion));
    assert!(run.outcome.cleanup_error().is_none());
}

#[tokio::test]
async fn test_cleanup_failure_does_not_mask_primary_failure() {
    let mut test = ScriptedTest::passing("cuDNN")
        .with(Phase::Initialize, Behaviour::Fail)
        .with(Phase::Cleanup, Behaviour::Fail);

    let run = run_test(&mut test, &LifecycleOptions::default()).await;

    match &run.outcome {
        ExecutionOutcome::Failed { primary, cleanup } => {
            assert_eq!(primary.phase(), Phase::Initialize);
            assert_eq!(cleanup.as_ref().map(|e| e.phase()), Some(Phase::Cleanup));
        }
        other => panic!("expected Failed outcome, got {:?}", other),
    }
    let err = run.into_result().unwrap_err();
    assert_eq!(err.phase(), Phase::Initialize, "the original error is the one propagated");
}

#[tokio::test]
async fn test_cleanup_only_failure_is_not_success() {
    let mut test = ScriptedTest::passing("cuDNN").with(Phase::Cleanup, Behaviour::Fail);

    let run = run_test(&mut test, &LifecycleOptions::default()).await;

    assert!(matches!(run.outcome, ExecutionOutcome::CleanupFailed(_)));
    assert!(!run.is_success());
    assert_eq!(run.phases.len(), 4);
    assert_eq!(run.into_result().unwrap_err().phase(), Phase::Cleanup);
}

#[tokio::test]
async fn test_panicking_phase_still_runs_cleanup() {
    let mut test = ScriptedTest::passing("cuDNN").with(Phase::ExecuteTests, Behaviour::Panic);
    let calls = test.calls();

    let run = run_test(&mut test, &LifecycleOptions::default()).await;

    assert_eq!(calls.lock().unwrap().last(), Some(&Phase::Cleanup));
    match run.into_result() {
        Err(LifecycleError::Panicked { phase, message, .. }) => {
            assert_eq!(phase, Phase::ExecuteTests);
            assert!(message.contains("ExecuteTests panicked on purpose"));
        }
        other => panic!("expected Panicked error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_phase_timeout_fails_phase_and_runs_cleanup() {
    let mut test = ScriptedTest::passing("slow")
        .with(Phase::ExecuteTests, Behaviour::Sleep(Duration::from_secs(30)));
    let calls = test.calls();
    let options = LifecycleOptions::with_phase_timeout(Duration::from_millis(20));

    let run = run_test(&mut test, &options).await;

    assert_eq!(calls.lock().unwrap().last(), Some(&Phase::Cleanup));
    match run.into_result() {
        Err(LifecycleError::TimedOut { phase, timeout, .. }) => {
            assert_eq!(phase, Phase::ExecuteTests);
            assert_eq!(timeout, Duration::from_millis(20));
        }
        other => panic!("expected TimedOut error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_phase_within_timeout_passes() {
    let mut test = ScriptedTest::passing("quick")
        .with(Phase::Initialize, Behaviour::Sleep(Duration::from_millis(1)));
    let options = LifecycleOptions::with_phase_timeout(Duration::from_secs(5));

    let run = run_test(&mut test, &options).await;

    assert!(run.is_success());
}

#[tokio::test]
async fn test_cleanup_panic_after_passing_phases_is_cleanup_failure() {
    let mut test = ScriptedTest::passing("cuBLAS").with(Phase::Cleanup, Behaviour::Panic);
    let calls = test.calls();

    let run = run_test(&mut test, &LifecycleOptions::default()).await;

    assert_eq!(*calls.lock().unwrap(), Phase::ORDERED.to_vec());
    assert!(!run.is_success());
    assert!(run.outcome.primary_error().is_none());
    match run.outcome {
        ExecutionOutcome::CleanupFailed(LifecycleError::Panicked { phase, ref message, .. }) => {
            assert_eq!(phase, Phase::Cleanup);
            assert!(message.contains("Cleanup panicked on purpose"));
        }
        ref other => panic!("expected CleanupFailed(Panicked), got {:?}", other),
    }
}

#[tokio::test]
async fn test_phase_timeout_abandons_blocked_thread() {
    let mut test = ScriptedTest::passing("hung")
        .with(Phase::ExecuteTests, Behaviour::Block(Duration::from_millis(600)));
    let calls = test.calls();
    let options = LifecycleOptions::with_phase_timeout(Duration::from_millis(20));

    let started = Instant::now();
    let run = run_test(&mut test, &options).await;
    let elapsed = started.elapsed();

    assert!(elapsed < Duration::from_millis(400), "run waited {:?} for the blocked phase", elapsed);
    assert_eq!(calls.lock().unwrap().last(), Some(&Phase::Cleanup));
    match run.into_result() {
        Err(LifecycleError::TimedOut { phase, .. }) => assert_eq!(phase, Phase::ExecuteTests),
        other => panic!("expected TimedOut error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_run_blocking_returns_value_and_reraises_panics() {
    assert_eq!(run_blocking(|| 7).await.unwrap(), 7);

    let outcome = AssertUnwindSafe(run_blocking(|| -> u32 { panic!("foreign call crashed") }))
        .catch_unwind()
        .await;
    assert!(outcome.is_err());
}
