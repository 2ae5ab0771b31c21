//! # CUDA Env Core Kernel Errors
//!
//! Defines the crate-wide [`Error`] type.
//!
//! Failures of a single device or library test are recorded in the run
//! summary, never returned. What is left for this type is what stops the
//! binary itself: registration, configuration, report output and logging.
use std::result::Result as StdResult;

use thiserror::Error as ThisError;

use crate::config::ConfigError;
use crate::library_test::error::RegistryError;

/// Custom error type for the CUDA environment tester
#[derive(Debug, ThisError)]
pub enum Error {
    /// A library test could not be registered
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The report sink could not be written
    #[error("Report output error: {0}")]
    Report(#[source] std::io::Error),

    /// Logging could not be initialised
    #[error("Logging setup error: {0}")]
    Logging(String),

    /// Generic error with message
    #[error("Error: {0}")]
    Other(String),
}

/// Shorthand for Result with our Error type
pub type Result<T> = StdResult<T, Error>;

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

// Writes only happen through report sinks, so a bare io::Error is a report failure.
impl From<std::io::Error> for Error {
    fn from(io_err: std::io::Error) -> Self {
        Error::Report(io_err)
    }
}
