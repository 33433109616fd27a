mod cli;
mod commands;

use anyhow::Context;
use clap::Parser;
use lectern_core::Config;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_subscriber();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;

    match cli.command {
        Commands::Build {
            corpus,
            index,
            json,
        } => commands::build(config, corpus, index, json).await,
        Commands::Ask {
            question,
            top_k,
            json,
        } => commands::ask(&config, question, top_k, json).await,
        Commands::Quiz { topic, count, json } => {
            commands::quiz(&config, &topic, usize::from(count), json).await
        }
    }
}

/// Logs go to stderr so `--json` output on stdout stays machine-readable.
fn init_subscriber() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
