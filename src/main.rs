//! uniparse - document to markdown extraction.
//!
//! Parses PDF, Office, CSV, HTML and text documents into markdown, from the
//! command line or over HTTP.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use uniparse::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    let default_filter = if cli::is_verbose() {
        "uniparse=info"
    } else {
        "uniparse=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    cli::run().await
}
