//! Search service binary entry point.
//!
//! A thin wrapper around the mbflat-search library: parse configuration,
//! initialize logging, run the server.

use anyhow::Result;
use mbflat_search::{SearchConfig, Server};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = SearchConfig::from_args();
    tracing::info!(
        "Starting search service: db_dir={:?}, docs_root={:?}, bind={}",
        config.db_dir,
        config.docs_root,
        config.bind
    );

    Server::new(config).run().await?;
    Ok(())
}
