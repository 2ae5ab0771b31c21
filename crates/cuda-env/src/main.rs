mod cli;

use std::io;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info, warn};
use tokio::runtime::Builder;

use cuda_env_core::config::{BackendKind, HarnessConfig};
use cuda_env_core::device::DeviceQuery;
use cuda_env_core::kernel::constants::{APP_NAME, APP_VERSION, EXIT_CONFIG_ERROR, EXIT_FAILURE, EXIT_SUCCESS};
use cuda_env_core::kernel::error::{Error, Result};
use cuda_env_core::library_test::TestRegistry;
use cuda_env_core::{logging, report, Harness};

use crate::cli::{CliArgs, Commands};

fn main() -> ExitCode {
    let args = CliArgs::parse();

    if let Err(e) = logging::init(args.verbose) {
        eprintln!("Warning: {}", e);
    }
    info!("{} v{}", APP_NAME, APP_VERSION);

    let runtime = match Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: could not start the async runtime: {}", e);
            return ExitCode::from(EXIT_FAILURE);
        }
    };
    let code = runtime.block_on(run(args));
    // A library call abandoned by a phase timeout may still be blocked; do not wait for it.
    runtime.shutdown_background();
    code
}

async fn run(args: CliArgs) -> ExitCode {
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let query = match build_query(&config) {
        Ok(query) => query,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    // Library test crates register their own tests; nothing here names them.
    // A rejected registration is reported and the remaining tests still run.
    let mut registry = TestRegistry::new();
    let rejected = core_library_tests::register_all(&mut registry);
    let registration_failed = !rejected.is_empty();
    for e in rejected {
        let e = Error::from(e);
        warn!("{}", e);
        eprintln!("Warning: {}", e);
    }

    let harness = Harness::from_config(&config, query, registry);
    let mut sink = report::sink_for(config.report_format, Box::new(io::stdout()));

    let outcome = match args.command.unwrap_or(Commands::Run) {
        Commands::Run => harness.run(sink.as_mut()).await.map(|summary| {
            if registration_failed {
                EXIT_FAILURE
            } else {
                summary.exit_code()
            }
        }),
        Commands::Devices => harness.devices(sink.as_mut()).map(|summary| summary.exit_code()),
        Commands::List => harness.list(sink.as_mut()).map(|_| EXIT_SUCCESS),
    };

    match outcome {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn load_config(args: &CliArgs) -> Result<HarnessConfig> {
    let mut config = HarnessConfig::load_or_default(args.config.as_deref())?;
    config.apply(args.overrides())?;
    Ok(config)
}

fn build_query(config: &HarnessConfig) -> Result<Box<dyn DeviceQuery>> {
    match config.backend {
        BackendKind::Mock => Ok(Box::new(config.mock_query())),
        #[cfg(feature = "nvml")]
        BackendKind::Nvml => Ok(Box::new(cuda_env_core::device::nvml::NvmlDeviceQuery::init())),
        #[cfg(not(feature = "nvml"))]
        BackendKind::Nvml => Err(Error::Other(
            "the nvml backend is not compiled in; rebuild with the `nvml` feature or use --backend mock"
                .to_string(),
        )),
    }
}
