//! # CUDA Env Core Library Test System
//!
//! Infrastructure for pluggable library capability checks: the contract every
//! check implements, the fixed lifecycle that drives it, and the registry that
//! discovers checks at startup without the driver naming their types.
//!
//! ## Key Submodules and Responsibilities:
//!
//! - **[`traits`]**: the [`LibraryTest`] trait and the [`Phase`] enum. A test
//!   exposes its library name and version and implements four phases.
//! - **[`lifecycle`]**: [`run_test`](lifecycle::run_test), the free-standing
//!   orchestration of initialize → verify version → execute → cleanup. Cleanup
//!   always runs and never masks an earlier failure. Phases hand blocking
//!   work to [`run_blocking`](lifecycle::run_blocking) so timeouts can fire.
//! - **[`registry`]**: the [`TestRegistry`] of factories keyed by the test
//!   type's declared name, yielding candidates in ascending name order.
//! - **[`error`]**: lifecycle, discovery and registration errors.
//! - **[`version`]**: helpers library tests use to compare a detected library
//!   version against the declared one.
pub mod error;
pub mod lifecycle;
pub mod registry;
pub mod traits;
pub mod version;

pub use error::{DiscoveryError, LifecycleError, RegistryError};
pub use lifecycle::{run_blocking, run_test, ExecutionOutcome, LifecycleOptions, PhaseRecord, TestRun};
pub use registry::{Candidate, DiscoveredTest, Discovery, TestRegistry};
pub use traits::{LibraryTest, Phase, PhaseResult, TestDescriptor};
pub use version::{LibraryVersion, VersionPolicy};

// Test module declaration
#[cfg(test)]
pub(crate) mod tests;
