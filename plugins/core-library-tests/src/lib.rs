//! Library capability tests for the CUDA environment tester.
//!
//! Each test loads its library at runtime, so the crate builds and registers
//! on hosts without CUDA installed; the missing library shows up as an
//! Initialize failure in the run.
pub mod cublas;
pub mod cudnn;
mod dylib;

use cuda_env_core::library_test::{RegistryError, TestRegistry};
use log::{debug, warn};

pub use cublas::CublasTest;
pub use cudnn::CudnnTest;
pub use dylib::LibraryError;

/// Register every test this crate provides.
///
/// A rejected registration does not stop the others; the rejections are
/// returned for the caller to report.
pub fn register_all(registry: &mut TestRegistry) -> Vec<RegistryError> {
    let results = [registry.register::<CudnnTest>(), registry.register::<CublasTest>()];
    let rejected: Vec<RegistryError> = results.into_iter().filter_map(Result::err).collect();
    for err in &rejected {
        warn!("Skipping library test: {}", err);
    }
    debug!("Registered core library tests ({} rejected)", rejected.len());
    rejected
}
