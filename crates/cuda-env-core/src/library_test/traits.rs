use std::error::Error as StdError;
use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use crate::kernel::constants::TEMPLATE_VERSION;

/// Result returned by every lifecycle phase.
///
/// Phase bodies belong to the concrete test, so their errors are opaque to the
/// lifecycle and only need to be displayable and sendable.
pub type PhaseResult = std::result::Result<(), Box<dyn StdError + Send + Sync + 'static>>;

/// The four lifecycle phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Phase {
    Initialize,
    VerifyVersion,
    ExecuteTests,
    Cleanup,
}

impl Phase {
    /// All phases in the order the lifecycle runs them.
    pub const ORDERED: [Phase; 4] = [
        Phase::Initialize,
        Phase::VerifyVersion,
        Phase::ExecuteTests,
        Phase::Cleanup,
    ];

    /// Whether a failure in this phase is a primary failure.
    pub fn is_mandatory(&self) -> bool {
        !matches!(self, Phase::Cleanup)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Initialize => write!(f, "Initialize"),
            Phase::VerifyVersion => write!(f, "VerifyVersion"),
            Phase::ExecuteTests => write!(f, "ExecuteTests"),
            Phase::Cleanup => write!(f, "Cleanup"),
        }
    }
}

/// Identifies a library test by the library it checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestDescriptor {
    pub name: String,
    pub version: String,
}

impl TestDescriptor {
    pub fn of(test: &dyn LibraryTest) -> Self {
        Self {
            name: test.library_name().to_string(),
            version: test.library_version().to_string(),
        }
    }
}

impl fmt::Display for TestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{}", self.name, self.version)
    }
}

/// Core trait that all library tests must implement
///
/// Implementations only describe *what* each phase does. The order of the
/// phases and the guarantee that [`cleanup`](LibraryTest::cleanup) runs are
/// owned by [`run_test`](crate::library_test::lifecycle::run_test), which is
/// the only supported way to drive a test.
#[async_trait]
pub trait LibraryTest: Send {
    /// The name of the library under test, e.g. "cuDNN"
    fn library_name(&self) -> &str;

    /// The library version this test expects, e.g. "9.5.1"
    fn library_version(&self) -> &str;

    /// The lifecycle template version the implementation was written against.
    fn template_version(&self) -> &str {
        TEMPLATE_VERSION
    }

    /// Load the library and acquire whatever resources the later phases need.
    async fn initialize(&mut self) -> PhaseResult;

    /// Check that the loaded library matches [`library_version`](LibraryTest::library_version).
    async fn verify_version(&mut self) -> PhaseResult;

    /// Exercise the library.
    async fn execute_tests(&mut self) -> PhaseResult;

    /// Release everything acquired since `initialize`.
    ///
    /// Called exactly once per run, even when an earlier phase failed, so it
    /// must tolerate partially initialised state.
    async fn cleanup(&mut self) -> PhaseResult;
}
