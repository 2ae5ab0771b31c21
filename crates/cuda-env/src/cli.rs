use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use cuda_env_core::config::{BackendKind, ConfigOverrides};
use cuda_env_core::report::ReportFormat;

/// Enumerate GPU compute devices and run every registered library test
#[derive(Parser, Debug)]
#[command(name = "cuda-env", author, version, about, long_about = None)]
pub struct CliArgs {
    /// Configuration file (.json, .yaml, .yml or .toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Report rendering
    #[arg(long, global = true, value_enum)]
    pub format: Option<FormatArg>,

    /// Device query backend
    #[arg(long, global = true, value_enum)]
    pub backend: Option<BackendArg>,

    /// Upper bound in seconds for each lifecycle phase
    #[arg(long, global = true, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub phase_timeout: Option<u64>,

    /// Run library tests even when devices could not be enumerated
    #[arg(long, global = true)]
    pub continue_on_enumeration_failure: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Enumerate devices, then run every library test (default)
    Run,
    /// Enumerate and report devices only
    Devices,
    /// List registered library tests in execution order
    List,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatArg {
    Plain,
    Table,
    Json,
}

impl From<FormatArg> for ReportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Plain => ReportFormat::Plain,
            FormatArg::Table => ReportFormat::Table,
            FormatArg::Json => ReportFormat::Json,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendArg {
    Nvml,
    Mock,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Nvml => BackendKind::Nvml,
            BackendArg::Mock => BackendKind::Mock,
        }
    }
}

impl CliArgs {
    /// Flags that take precedence over the config file.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            backend: self.backend.map(Into::into),
            report_format: self.format.map(Into::into),
            phase_timeout_secs: self.phase_timeout,
            continue_on_enumeration_failure: self.continue_on_enumeration_failure,
        }
    }
}
