use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use dotenv::dotenv;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod app;
mod app_state;
mod config;
mod db;
mod email;
mod error;
mod modules;
mod scheduling;

use app_state::AppState;
use db::repositories::PgAgreementRepository;
use email::LoggingEmailSender;
use scheduling::expiration::ExpirationSweeper;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=debug", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenv().ok();

    let env = config::init()?.clone();
    let pool = db::init_pool().await?;

    let email = Arc::new(LoggingEmailSender);

    // Background expiration sweep with cooperative shutdown: the token stops
    // new iterations, then the server drains in-flight requests.
    let shutdown = CancellationToken::new();
    let sweeper = ExpirationSweeper::new(
        Arc::new(PgAgreementRepository::new(pool.clone())),
        Duration::from_secs(env.booking.sweep_interval_secs),
        shutdown.clone(),
    );
    let sweeper_handle = tokio::spawn(sweeper.run());

    let state = AppState::new(pool, env.clone(), email);
    let app = app::create_router(state);

    let addr = env.server_addr();
    info!("salon backend listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .context("Failed to serve application")?;

    shutdown.cancel();
    sweeper_handle.await.ok();

    Ok(())
}

async fn shutdown_signal(sweeper_shutdown: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    info!("shutdown signal received");
    sweeper_shutdown.cancel();
}
