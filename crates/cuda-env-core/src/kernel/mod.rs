//! # CUDA Env Core Kernel
//!
//! Shared foundation for the rest of the crate.
//!
//! - **Core Constants**: application name, template version and exit codes
//!   live in the `constants` submodule.
//! - **Error Handling**: the crate-wide [`Error`](error::Error) for failures
//!   that stop the binary, with a matching `Result` alias in the `error`
//!   submodule.
pub mod constants;
pub mod error;

pub use error::{Error, Result};
