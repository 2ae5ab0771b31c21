use std::error::Error as StdError;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use futures::FutureExt;
use log::{debug, error, info, warn};

use crate::library_test::error::{panic_message, LifecycleError};
use crate::library_test::traits::{LibraryTest, Phase, TestDescriptor};

/// Knobs for a single lifecycle run.
#[derive(Debug, Clone, Default)]
pub struct LifecycleOptions {
    /// Upper bound for each phase. Only enforced at await points of the phase,
    /// so blocking work has to go through [`run_blocking`].
    pub phase_timeout: Option<Duration>,
}

impl LifecycleOptions {
    pub fn with_phase_timeout(timeout: Duration) -> Self {
        Self {
            phase_timeout: Some(timeout),
        }
    }
}

/// Final state of a library test run.
#[derive(Debug)]
pub enum ExecutionOutcome {
    /// All four phases succeeded.
    Success,
    /// Initialize, VerifyVersion or ExecuteTests failed. A cleanup failure
    /// that followed is kept alongside, never in place of, the primary one.
    Failed {
        primary: LifecycleError,
        cleanup: Option<LifecycleError>,
    },
    /// Every mandatory phase succeeded but cleanup failed.
    CleanupFailed(LifecycleError),
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Success)
    }

    /// The failure of Initialize, VerifyVersion or ExecuteTests, if any.
    pub fn primary_error(&self) -> Option<&LifecycleError> {
        match self {
            ExecutionOutcome::Failed { primary, .. } => Some(primary),
            _ => None,
        }
    }

    pub fn cleanup_error(&self) -> Option<&LifecycleError> {
        match self {
            ExecutionOutcome::Failed { cleanup, .. } => cleanup.as_ref(),
            ExecutionOutcome::CleanupFailed(err) => Some(err),
            ExecutionOutcome::Success => None,
        }
    }
}

/// Record of one executed phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseRecord {
    pub phase: Phase,
    pub passed: bool,
    pub elapsed: Duration,
}

/// Everything the lifecycle observed while running one test.
#[derive(Debug)]
pub struct TestRun {
    pub descriptor: TestDescriptor,
    pub template_version: String,
    pub phases: Vec<PhaseRecord>,
    pub outcome: ExecutionOutcome,
}

impl TestRun {
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    /// Phases in the order they were invoked.
    pub fn invoked_phases(&self) -> Vec<Phase> {
        self.phases.iter().map(|record| record.phase).collect()
    }

    /// Collapse the run into the error a caller should see.
    ///
    /// The primary failure wins; a cleanup failure is only returned when it
    /// is the sole failure.
    pub fn into_result(self) -> std::result::Result<(), LifecycleError> {
        match self.outcome {
            ExecutionOutcome::Success => Ok(()),
            ExecutionOutcome::Failed { primary, .. } => Err(primary),
            ExecutionOutcome::CleanupFailed(err) => Err(err),
        }
    }
}

/// Run a library test through Initialize, VerifyVersion, ExecuteTests and Cleanup.
///
/// The first failing mandatory phase stops the remaining mandatory phases.
/// Cleanup is invoked exactly once in every case, including after a panic or
/// a timeout in an earlier phase.
pub async fn run_test(test: &mut dyn LibraryTest, options: &LifecycleOptions) -> TestRun {
    let descriptor = TestDescriptor::of(test);
    let template_version = test.template_version().to_string();
    info!("Running library test {}", descriptor);
    info!("Using template version: {}", template_version);

    let mut phases = Vec::with_capacity(Phase::ORDERED.len());
    let mut primary = None;

    for phase in Phase::ORDERED.into_iter().filter(Phase::is_mandatory) {
        let (record, result) = timed_phase(test, phase, options).await;
        phases.push(record);
        if let Err(err) = result {
            error!("{}", err);
            primary = Some(err);
            break;
        }
    }

    let (record, cleanup_result) = timed_phase(test, Phase::Cleanup, options).await;
    phases.push(record);
    let cleanup = match cleanup_result {
        Ok(()) => None,
        Err(err) => {
            if primary.is_some() {
                warn!("Secondary failure: {}", err);
            } else {
                error!("{}", err);
            }
            Some(err)
        }
    };

    let outcome = match (primary, cleanup) {
        (None, None) => ExecutionOutcome::Success,
        (Some(primary), cleanup) => ExecutionOutcome::Failed { primary, cleanup },
        (None, Some(cleanup)) => ExecutionOutcome::CleanupFailed(cleanup),
    };

    if outcome.is_success() {
        info!("Library test {} completed successfully", descriptor);
    }

    TestRun {
        descriptor,
        template_version,
        phases,
        outcome,
    }
}

/// Run blocking work, such as a call into a foreign library, on tokio's
/// blocking pool.
///
/// The phase future awaits the spawned task, so a phase timeout abandons the
/// work instead of waiting for it. The abandoned work keeps running to
/// completion on its own thread; anything it uses must be owned by `work`.
/// A panic inside `work` is re-raised here and reported as a panicked phase.
pub async fn run_blocking<F, T>(work: F) -> std::result::Result<T, Box<dyn StdError + Send + Sync>>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(value) => Ok(value),
        Err(err) => match err.try_into_panic() {
            Ok(payload) => panic::resume_unwind(payload),
            Err(err) => Err(Box::new(err)),
        },
    }
}

async fn timed_phase(
    test: &mut dyn LibraryTest,
    phase: Phase,
    options: &LifecycleOptions,
) -> (PhaseRecord, std::result::Result<(), LifecycleError>) {
    let started = Instant::now();
    let result = run_phase(test, phase, options).await;
    let elapsed = started.elapsed();
    debug!(
        "{} {} in {:?}",
        phase,
        if result.is_ok() { "passed" } else { "failed" },
        elapsed
    );
    let record = PhaseRecord {
        phase,
        passed: result.is_ok(),
        elapsed,
    };
    (record, result)
}

async fn run_phase(
    test: &mut dyn LibraryTest,
    phase: Phase,
    options: &LifecycleOptions,
) -> std::result::Result<(), LifecycleError> {
    let name = test.library_name().to_string();
    let future = match phase {
        Phase::Initialize => test.initialize(),
        Phase::VerifyVersion => test.verify_version(),
        Phase::ExecuteTests => test.execute_tests(),
        Phase::Cleanup => test.cleanup(),
    };
    let guarded = AssertUnwindSafe(future).catch_unwind();

    let completed = match options.phase_timeout {
        Some(timeout) => match tokio::time::timeout(timeout, guarded).await {
            Ok(completed) => completed,
            Err(_) => {
                return Err(LifecycleError::TimedOut {
                    test: name,
                    phase,
                    timeout,
                });
            }
        },
        None => guarded.await,
    };

    match completed {
        Ok(Ok(())) => Ok(()),
        Ok(Err(source)) => Err(LifecycleError::Phase {
            test: name,
            phase,
            source,
        }),
        Err(payload) => Err(LifecycleError::Panicked {
            test: name,
            phase,
            message: panic_message(&*payload),
        }),
    }
}
