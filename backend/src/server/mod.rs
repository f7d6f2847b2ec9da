//! Server construction and middleware wiring.

mod config;
mod state_builders;

pub use config::ServerConfig;
pub use state_builders::{Assembly, build_assembly};

use actix_cors::Cors;
use actix_web::body::MessageBody;
use std::future::Future;

use actix_web::dev::{Server, ServerHandle, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use tracing::{info, warn};

use profile_registry::Trace;
#[cfg(debug_assertions)]
use profile_registry::doc::ApiDoc;
use profile_registry::inbound::http::error::json_error_handler;
use profile_registry::inbound::http::health::{HealthState, live, ready};
use profile_registry::inbound::http::images::fetch_image;
use profile_registry::inbound::http::state::HttpState;
use profile_registry::inbound::http::users;
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    json_limit: usize,
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
        json_limit,
    } = deps;

    let cors = Cors::default()
        .allow_any_origin()
        .allow_any_method()
        .allow_any_header();

    let api = web::scope("/api/v1").configure(users::configure);

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .app_data(
            web::JsonConfig::default()
                .limit(json_limit)
                .error_handler(json_error_handler),
        )
        .wrap(cors)
        .wrap(Trace)
        .service(api)
        .service(fetch_image)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));
    #[cfg(not(debug_assertions))]
    let app = app;

    app
}

/// Construct an Actix HTTP server using the provided health state and configuration.
///
/// # Parameters
/// - `health_state`: shared readiness state updated once the server is initialised.
/// - `config`: pre-built [`ServerConfig`] carrying the bind address and handler state.
///
/// # Returns
/// A spawned [`Server`] that must be awaited to drive the listener. The server
/// ignores process signals; pair it with [`drain_on`].
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let server_health_state = health_state.clone();
    let json_limit = config.json_limit();
    let ServerConfig {
        bind_addr,
        http_state,
    } = config;
    let http_state = web::Data::new(http_state);

    let server = HttpServer::new(move || {
        build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
            json_limit,
        })
    })
    .disable_signals()
    .bind(bind_addr)?
    .run();

    health_state.mark_ready();
    Ok(server)
}

/// Fail liveness once `signal` resolves, then stop the server gracefully.
///
/// A listener error is logged and leaves the server running.
pub async fn drain_on<F>(health_state: web::Data<HealthState>, handle: ServerHandle, signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(err) = signal.await {
        warn!(error = %err, "shutdown signal listener failed");
        return;
    }
    health_state.mark_unhealthy();
    info!("shutdown requested; draining connections");
    handle.stop(true).await;
}

#[cfg(test)]
mod tests;
