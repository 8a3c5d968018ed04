//! Warden Server — Application entry point.

mod config;

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use warden_auth::AuthService;
use warden_db::repository::{SurrealSessionRepository, SurrealUserRepository};
use warden_db::{DbManager, run_migrations};

use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warden=info")),
        )
        .json()
        .init();

    let config = Config::from_env()?;
    info!(?config, "Starting Warden server...");

    let db = DbManager::connect(&config.db).await?;
    run_migrations(db.client()).await?;

    let service = Arc::new(AuthService::new(
        SurrealUserRepository::new(db.client().clone()),
        SurrealSessionRepository::new(db.client().clone()),
        config.auth.clone(),
    )?);

    let sweeper = (config.session_sweep_secs > 0).then(|| {
        let service = Arc::clone(&service);
        let period = Duration::from_secs(config.session_sweep_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                match service.cleanup_expired_sessions().await {
                    Ok(0) => {}
                    Ok(removed) => info!(removed, "Expired sessions swept"),
                    Err(e) => error!(error = %e, "Session sweep failed"),
                }
            }
        })
    });

    info!("Warden ready");
    tokio::signal::ctrl_c().await?;

    if let Some(handle) = sweeper {
        handle.abort();
    }
    info!("Warden server stopped.");
    Ok(())
}
