/// NearCard - NFC business card binding and redirect service
///
/// Maps physical NFC card identifiers to blockchain accounts and resolves
/// taps to their destination URL: registration for unbound cards, the
/// party-mode link or default URL for bound ones, falling back to the
/// owner's profile view.
mod api;
mod audit;
mod cards;
mod config;
mod context;
mod db;
mod error;
mod redirect;
mod server;

use config::ServerConfig;
use context::AppContext;
use error::CardResult;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> CardResult<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nearcard=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!(
        "NearCard binding & redirect service v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Load configuration
    let config = ServerConfig::from_env()?;

    // Create application context
    let ctx = AppContext::new(config).await?;

    // Start server
    server::serve(ctx).await?;

    Ok(())
}
