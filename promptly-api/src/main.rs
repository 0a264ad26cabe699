//! Promptly API - main entry point.

use anyhow::Result;
use promptly_common::config::Config;
use promptly_common::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load()?;

    // Refuse to start without identity-provider credentials
    if let Err(e) = config.validate() {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    // Initialize logging
    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    tracing::info!("Promptly API v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(provider = %config.ai.provider, "AI service provider selected");

    // Start the server
    promptly_api::start_server(&config).await
}
