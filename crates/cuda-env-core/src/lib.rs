pub mod config;
pub mod device;
pub mod harness;
pub mod kernel;
pub mod library_test;
pub mod logging;
pub mod report;

// Re-export key public types/traits for easier use by the binary and library test crates
pub use config::HarnessConfig;
pub use device::{DeviceDescriptor, DeviceHandle, DeviceQuery};
pub use harness::{Harness, RunSummary};
pub use kernel::error::Error as KernelError;
pub use library_test::{LibraryTest, PhaseResult, TestRegistry};
pub use report::ReportSink;
