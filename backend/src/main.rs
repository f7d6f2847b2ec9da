//! Backend entry-point: loads settings, prepares storage and serves the REST API.

mod server;

use actix_web::web;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use profile_registry::inbound::http::health::HealthState;
use profile_registry::outbound::persistence::{DbPool, PoolConfig, run_migrations};
use profile_registry::settings::AppSettings;
use server::{Assembly, ServerConfig, build_assembly, create_server, drain_on};

/// Migrate the schema and open a pool when a database URL is configured.
async fn connect(settings: &AppSettings) -> std::io::Result<Option<DbPool>> {
    let Some(database_url) = settings.database_url.as_deref() else {
        return Ok(None);
    };
    run_migrations(database_url)
        .await
        .map_err(std::io::Error::other)?;
    let pool = DbPool::new(PoolConfig::new(database_url))
        .await
        .map_err(std::io::Error::other)?;
    Ok(Some(pool))
}

/// Resolve on SIGINT, or SIGTERM where the platform has it.
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    let mut terminate =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    #[cfg(unix)]
    let terminated = async {
        terminate.recv().await;
    };
    #[cfg(not(unix))]
    let terminated = std::future::pending::<()>();

    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        () = terminated => Ok(()),
    }
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = AppSettings::load_from_iter(std::env::args_os())
        .map_err(|err| std::io::Error::other(err.to_string()))?;
    let bind_addr = settings.bind_addr().map_err(std::io::Error::other)?;

    let pool = connect(&settings).await?;
    let Assembly {
        http_state,
        reconciler,
    } = build_assembly(&settings, pool)?;
    match reconciler {
        Some(reconciler) => {
            actix_web::rt::spawn(reconciler);
        }
        None => info!("orphan reconciliation disabled"),
    }

    let health_state = web::Data::new(HealthState::new());
    info!(%bind_addr, "starting profile registry");
    let server = create_server(health_state.clone(), ServerConfig::new(bind_addr, http_state))?;
    actix_web::rt::spawn(drain_on(health_state, server.handle(), shutdown_signal()));
    server.await
}
