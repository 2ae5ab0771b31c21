//! # CUDA Env Core Configuration
//!
//! [`HarnessConfig`] holds every knob of a run. It is read from an optional
//! JSON, YAML (`yaml-config`) or TOML (`toml-config`) file, chosen by file
//! extension, and then overridden by command-line flags through
//! [`ConfigOverrides`].
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::device::{DeviceDescriptor, MockDeviceQuery};
use crate::library_test::LifecycleOptions;
use crate::report::ReportFormat;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigFormat {
    /// JSON format (.json)
    Json,
    /// YAML format (.yaml, .yml) - requires "yaml-config" feature
    #[cfg(feature = "yaml-config")]
    Yaml,
    /// TOML format (.toml) - requires "toml-config" feature
    #[cfg(feature = "toml-config")]
    Toml,
}

impl ConfigFormat {
    /// Get the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Json => "json",
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => "yaml",
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => "toml",
        }
    }

    /// Determine format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "json" => Some(ConfigFormat::Json),
                #[cfg(feature = "yaml-config")]
                "yaml" | "yml" => Some(ConfigFormat::Yaml),
                #[cfg(feature = "toml-config")]
                "toml" => Some(ConfigFormat::Toml),
                _ => None,
            })
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported config format for {path} (expected .json, .yaml, .yml or .toml)")]
    UnsupportedFormat { path: PathBuf },

    #[error("Invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "yaml-config")]
    #[error("Invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[cfg(feature = "toml-config")]
    #[error("Invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid config value for '{field}': {message}")]
    Invalid { field: &'static str, message: String },
}

/// Which [`DeviceQuery`](crate::device::DeviceQuery) backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Nvml,
    Mock,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Nvml => write!(f, "nvml"),
            BackendKind::Mock => write!(f, "mock"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nvml" => Ok(BackendKind::Nvml),
            "mock" => Ok(BackendKind::Mock),
            other => Err(format!("unknown device backend '{}'", other)),
        }
    }
}

/// Settings for a harness run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    pub backend: BackendKind,
    pub report_format: ReportFormat,
    /// Upper bound in seconds for each lifecycle phase. Unbounded when absent.
    pub phase_timeout_secs: Option<u64>,
    /// Run library tests even when the device count could not be queried.
    pub continue_on_enumeration_failure: bool,
    /// Devices served by the mock backend. Empty means the built-in pair.
    pub mock_devices: Vec<DeviceDescriptor>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Nvml,
            report_format: ReportFormat::Plain,
            phase_timeout_secs: None,
            continue_on_enumeration_failure: false,
            mock_devices: Vec::new(),
        }
    }
}

/// Values given on the command line. `None` keeps the configured value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub backend: Option<BackendKind>,
    pub report_format: Option<ReportFormat>,
    pub phase_timeout_secs: Option<u64>,
    pub continue_on_enumeration_failure: bool,
}

impl HarnessConfig {
    /// Load and validate a config file, picking the format from its extension.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let format = ConfigFormat::from_path(path).ok_or_else(|| ConfigError::UnsupportedFormat {
            path: path.to_path_buf(),
        })?;
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loading {} config from {}", format.extension(), path.display());
        Self::parse(&contents, format)
    }

    /// Parse and validate config text in the given format.
    pub fn parse(contents: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        let config: HarnessConfig = match format {
            ConfigFormat::Json => serde_json::from_str(contents)?,
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::from_str(contents)?,
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::from_str(contents)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load `path` when given, otherwise start from the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.phase_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid {
                field: "phase_timeout_secs",
                message: "must be at least 1 second".to_string(),
            });
        }
        if let Some(index) = self.mock_devices.iter().position(|d| d.name.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                field: "mock_devices",
                message: format!("device {} has an empty name", index),
            });
        }
        Ok(())
    }

    /// Apply command-line values on top of the loaded config.
    pub fn apply(&mut self, overrides: ConfigOverrides) -> Result<(), ConfigError> {
        if let Some(backend) = overrides.backend {
            self.backend = backend;
        }
        if let Some(format) = overrides.report_format {
            self.report_format = format;
        }
        if let Some(secs) = overrides.phase_timeout_secs {
            self.phase_timeout_secs = Some(secs);
        }
        if overrides.continue_on_enumeration_failure {
            self.continue_on_enumeration_failure = true;
        }
        self.validate()
    }

    pub fn phase_timeout(&self) -> Option<Duration> {
        self.phase_timeout_secs.map(Duration::from_secs)
    }

    pub fn lifecycle_options(&self) -> LifecycleOptions {
        LifecycleOptions {
            phase_timeout: self.phase_timeout(),
        }
    }

    /// Mock backend serving the configured devices, or the built-in pair.
    pub fn mock_query(&self) -> MockDeviceQuery {
        if self.mock_devices.is_empty() {
            MockDeviceQuery::builtin()
        } else {
            MockDeviceQuery::new(self.mock_devices.clone())
        }
    }
}
