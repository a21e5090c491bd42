use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
use cli::{Cli, Commands};

fn main() -> Result<()> {
    // Parse CLI arguments first to get verbosity level
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };

    // Logs go to stderr so stdout carries only the prompt
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let runtime = tokio::runtime::Runtime::new()?;

    match cli.command {
        Some(Commands::History(args)) => {
            debug!("History command: {:?}", args);
            cli::commands::history::execute(args, cli.config.as_deref())
        }
        Some(Commands::ListModels(args)) => {
            debug!("List models command: {:?}", args);
            runtime.block_on(cli::commands::list_models::execute(args, cli.config.as_deref()))
        }
        Some(Commands::Validate(args)) => {
            debug!("Validate command: {:?}", args);
            runtime.block_on(cli::commands::validate::execute(args, cli.config.as_deref()))
        }
        Some(Commands::Template(args)) => {
            debug!("Template command: {:?}", args);
            cli::commands::template::execute(args)
        }
        Some(Commands::Telemetry(command)) => {
            debug!("Telemetry command: {:?}", command);
            cli::commands::telemetry::execute(command, cli.config.as_deref())
        }
        None => runtime.block_on(cli::commands::refine::execute(cli.refine, cli.verbose, cli.config.as_deref())),
    }
}
