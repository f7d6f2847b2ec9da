//! User lifecycle endpoints.
//!
//! ```text
//! POST   /api/v1/users {"name":"Ada","email":"ada@x.com","image":"<base64>"}
//! GET    /api/v1/users
//! PUT    /api/v1/users {"userId":"<uuid>","name":"Ada","email":"ada@x.com"}
//! DELETE /api/v1/users {"userId":"<uuid>"}
//! ```
//!
//! Any other method on the collection answers 405.

use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};

use crate::domain::ports::{CreateUserRequest, DeleteUserRequest, UpdateUserRequest, UserListing};
use crate::domain::{Error, UserRecord};
use crate::inbound::http::ApiResult;
use crate::inbound::http::image_payload::decode_image;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;

/// Acknowledgement of a successful create.
pub const USER_CREATED: &str = "User created successfully!";
/// Acknowledgement of a successful update.
pub const USER_UPDATED: &str = "User updated successfully!";
/// Acknowledgement of a successful delete.
pub const USER_DELETED: &str = "User deleted successfully!";
/// Listing message when the store holds no documents.
pub const NO_USERS_FOUND: &str = "No users found";

/// Body of `POST /api/v1/users`.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserBody {
    /// Display name.
    pub name: Option<String>,
    /// Email address; must be unused.
    pub email: Option<String>,
    /// Base64 image, bare or as a `data:` URL.
    pub image: Option<String>,
}

/// Body of `PUT /api/v1/users`.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserBody {
    /// Record to update, sent as `userId` or `id`.
    #[serde(alias = "userId")]
    pub id: Option<String>,
    /// Replacement name.
    pub name: Option<String>,
    /// Replacement email.
    pub email: Option<String>,
}

/// Body of `DELETE /api/v1/users`.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteUserBody {
    /// Record to delete, sent as `userId` or `id`.
    #[serde(alias = "userId")]
    pub id: Option<String>,
}

/// Acknowledgement returned by update and delete.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    /// Outcome in words.
    #[schema(example = "User updated successfully!")]
    pub message: String,
}

/// Acknowledgement returned by create.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CreatedUserResponse {
    /// Outcome in words.
    #[schema(example = "User created successfully!")]
    pub message: String,
    /// Identifier of the new record.
    #[schema(example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    pub id: String,
}

/// Public projection of a stored user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    /// Record identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Public address of the profile image.
    pub image_locator: String,
}

impl From<&UserRecord> for UserResponse {
    fn from(record: &UserRecord) -> Self {
        Self {
            id: record.id().to_string(),
            name: record.name().to_string(),
            email: record.email().to_string(),
            image_locator: record.image_locator().to_string(),
        }
    }
}

/// Payload of `GET /api/v1/users`; `message` is set only for an empty store.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct UserListResponse {
    /// Present only when the store is empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Every listed user.
    pub users: Vec<UserResponse>,
}

impl From<UserListing> for UserListResponse {
    fn from(listing: UserListing) -> Self {
        let message = matches!(listing, UserListing::Empty).then(|| NO_USERS_FOUND.to_owned());
        Self {
            message,
            users: listing.users().iter().map(UserResponse::from).collect(),
        }
    }
}

fn acknowledge(message: &str) -> HttpResponse {
    HttpResponse::Ok().json(MessageResponse {
        message: message.to_owned(),
    })
}

/// Create a user and store their profile image.
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserBody,
    responses(
        (status = 200, description = "User created", body = CreatedUserResponse),
        (status = 400, description = "Missing fields, bad image or duplicate email", body = ErrorSchema),
        (status = 500, description = "Storage failure", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "createUser"
)]
pub async fn create_user(
    state: web::Data<HttpState>,
    payload: web::Json<CreateUserBody>,
) -> ApiResult<HttpResponse> {
    let body = payload.into_inner();
    let image = decode_image(body.image.as_deref(), state.max_image_bytes)?;
    let request = CreateUserRequest::try_from_parts(body.name, body.email, image)?;
    let created = state.users.create(request).await?;
    Ok(HttpResponse::Ok().json(CreatedUserResponse {
        message: USER_CREATED.to_owned(),
        id: created.id.to_string(),
    }))
}

/// List every stored user.
#[utoipa::path(
    get,
    path = "/api/v1/users",
    responses(
        (status = 200, description = "Users, possibly none", body = UserListResponse),
        (status = 500, description = "Record store failure", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "listUsers"
)]
pub async fn list_users(state: web::Data<HttpState>) -> ApiResult<web::Json<UserListResponse>> {
    let listing = state.users_query.list_users().await?;
    Ok(web::Json(UserListResponse::from(listing)))
}

/// Replace a user's name and email.
#[utoipa::path(
    put,
    path = "/api/v1/users",
    request_body = UpdateUserBody,
    responses(
        (status = 200, description = "User updated", body = MessageResponse),
        (status = 400, description = "Missing fields", body = ErrorSchema),
        (status = 404, description = "No such user", body = ErrorSchema),
        (status = 500, description = "Record store failure", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "updateUser"
)]
pub async fn update_user(
    state: web::Data<HttpState>,
    payload: web::Json<UpdateUserBody>,
) -> ApiResult<HttpResponse> {
    let body = payload.into_inner();
    let request = UpdateUserRequest::try_from_parts(body.id, body.name, body.email)?;
    state.users.update(request).await?;
    Ok(acknowledge(USER_UPDATED))
}

/// Delete a user together with their profile image.
#[utoipa::path(
    delete,
    path = "/api/v1/users",
    request_body = DeleteUserBody,
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 400, description = "Missing fields", body = ErrorSchema),
        (status = 404, description = "No such user", body = ErrorSchema),
        (status = 500, description = "Storage failure; the record is kept", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "deleteUser"
)]
pub async fn delete_user(
    state: web::Data<HttpState>,
    payload: web::Json<DeleteUserBody>,
) -> ApiResult<HttpResponse> {
    let request = DeleteUserRequest::try_from_parts(payload.into_inner().id)?;
    state.users.delete(request).await?;
    Ok(acknowledge(USER_DELETED))
}

async fn method_not_allowed() -> ApiResult<HttpResponse> {
    Err(Error::method_not_allowed(
        "Only GET, POST, PUT and DELETE requests are allowed.",
    ))
}

/// Register the users collection on a scope.
///
/// ```
/// use actix_web::{App, web};
/// use profile_registry::inbound::http::users;
///
/// let _app = App::new().service(web::scope("/api/v1").configure(users::configure));
/// ```
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/users")
            .route(web::post().to(create_user))
            .route(web::get().to(list_users))
            .route(web::put().to(update_user))
            .route(web::delete().to(delete_user))
            .default_service(web::to(method_not_allowed)),
    );
}
