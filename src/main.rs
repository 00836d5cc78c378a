use color_eyre::Result;
use tracing_subscriber::EnvFilter;

use debugscope::cli::{parse_args, run_cli_command, CliCommand};
use debugscope::config::DebugConfig;

/// Log filter when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "debugscope=info";

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let command = parse_args(std::env::args());

    // Handle --version before any initialization
    if command == CliCommand::Version {
        println!("{}", debugscope::cli::version_line());
        return Ok(());
    }

    color_eyre::install()?;
    init_tracing();

    let config = DebugConfig::from_env()?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run_cli_command(command, config))
}
