//! OpenAPI document for the REST API.
//!
//! Registers every inbound path plus the error schema mirrors from
//! [`crate::inbound::http::schemas`]. Swagger UI serves it in debug builds.

use utoipa::OpenApi;

use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema};
use crate::inbound::http::users::{
    CreateUserBody, CreatedUserResponse, DeleteUserBody, MessageResponse, UpdateUserBody,
    UserListResponse, UserResponse,
};

/// OpenAPI document for the profile registry.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Profile registry API",
        description = "Create, list, update and delete user records with profile images."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::users::create_user,
        crate::inbound::http::users::list_users,
        crate::inbound::http::users::update_user,
        crate::inbound::http::users::delete_user,
        crate::inbound::http::images::fetch_image,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        ErrorSchema,
        ErrorCodeSchema,
        CreateUserBody,
        UpdateUserBody,
        DeleteUserBody,
        CreatedUserResponse,
        MessageResponse,
        UserResponse,
        UserListResponse,
    )),
    tags(
        (name = "users", description = "User record lifecycle"),
        (name = "images", description = "Stored profile images"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
