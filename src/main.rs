use clap::Parser;
use typedapi::cli::{run_cli, Cli};
use typedapi::logging::init_logging;
use typedapi::runtime_config::RuntimeConfig;

fn main() -> anyhow::Result<()> {
    let config = RuntimeConfig::from_env();
    init_logging(&config.log)?;
    run_cli(Cli::parse())
}
