//! # CUDA Env Core Library Test Errors
//!
//! Defines error types specific to library tests.
//!
//! - [`LifecycleError`]: a phase of a running test failed, panicked or timed
//!   out. Always tagged with the test name and the phase.
//! - [`DiscoveryError`]: a registered candidate could not be instantiated.
//! - [`RegistryError`]: a test could not be registered.
use std::error::Error as StdError;
use std::time::Duration;

use thiserror::Error;

use crate::library_test::traits::Phase;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Library test '{test}' failed during {phase}: {source}")]
    Phase {
        test: String,
        phase: Phase,
        #[source]
        source: Box<dyn StdError + Send + Sync + 'static>,
    },

    #[error("Library test '{test}' panicked during {phase}: {message}")]
    Panicked {
        test: String,
        phase: Phase,
        message: String,
    },

    #[error("Library test '{test}' timed out during {phase} after {timeout:?}")]
    TimedOut {
        test: String,
        phase: Phase,
        timeout: Duration,
    },
}

impl LifecycleError {
    /// The phase the error occurred in.
    pub fn phase(&self) -> Phase {
        match self {
            LifecycleError::Phase { phase, .. }
            | LifecycleError::Panicked { phase, .. }
            | LifecycleError::TimedOut { phase, .. } => *phase,
        }
    }

    /// The library name of the failing test.
    pub fn test_name(&self) -> &str {
        match self {
            LifecycleError::Phase { test, .. }
            | LifecycleError::Panicked { test, .. }
            | LifecycleError::TimedOut { test, .. } => test,
        }
    }
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Could not construct library test '{key}': {message}")]
    Construction { key: String, message: String },

    #[error("Constructor of library test '{key}' panicked: {message}")]
    Panicked { key: String, message: String },
}

impl DiscoveryError {
    /// Registry key of the candidate that failed.
    pub fn key(&self) -> &str {
        match self {
            DiscoveryError::Construction { key, .. } | DiscoveryError::Panicked { key, .. } => key,
        }
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Library test already registered: {key}")]
    Duplicate { key: String },

    #[error("Library test key must not be empty")]
    EmptyKey,
}

/// Best-effort text for a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
