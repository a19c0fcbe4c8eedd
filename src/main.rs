use clap::Parser;
use routegate::cli::{run_cli, Cli};
use routegate::otel::{init_logging, LogConfig};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let log_guard = init_logging(&LogConfig::from_env())?;
    let status = run_cli(cli)?;
    drop(log_guard);
    std::process::exit(status);
}
