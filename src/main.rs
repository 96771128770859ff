use anyhow::Result;
use clap::Parser;
use lda_roberta::hybrid::cli::{run, Cli};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("lda_roberta=info")),
        )
        .init();

    run(Cli::parse())
}
