//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, web};

use crate::domain::ports::{MockUserLifecycleCommand, MockUserLifecycleQuery};
use crate::inbound::http::error::json_error_handler;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::{images, users};
use crate::middleware::Trace;

/// Build state over lifecycle mocks.
pub fn state_with(command: MockUserLifecycleCommand, query: MockUserLifecycleQuery) -> HttpState {
    HttpState::new(Arc::new(command), Arc::new(query))
}

/// App wired like production: trace middleware, JSON error handler, users
/// collection under `/api/v1` and the image route.
pub fn test_app(
    state: HttpState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .wrap(Trace)
        .app_data(web::Data::new(state))
        .app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .service(web::scope("/api/v1").configure(users::configure))
        .service(images::fetch_image)
}
