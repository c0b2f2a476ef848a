//! zotrag CLI entrypoint

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use zotrag::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // .env may carry RUST_LOG as well as credentials
    dotenv::dotenv().ok();

    // Logs go to stderr; stdout is for command output
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();
    cli.execute().await
}
