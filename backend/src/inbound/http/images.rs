//! Profile image delivery.
//!
//! Serves blobs written by the lifecycle service so locators built by the
//! in-memory and filesystem blob stores resolve against this server.

use actix_web::http::header::{CacheControl, CacheDirective};
use actix_web::{HttpResponse, get, web};

use crate::domain::{BlobKey, Error};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;

/// Cache lifetime for served images; keys are never reused.
const IMAGE_MAX_AGE_SECS: u32 = 86_400;

/// Fetch the stored bytes of one profile image.
#[utoipa::path(
    get,
    path = "/images/{key}",
    params(("key" = String, Path, description = "Blob key, e.g. `<userId>.jpg`")),
    responses(
        (status = 200, description = "Image bytes with their stored content type"),
        (status = 404, description = "No such image", body = ErrorSchema),
        (status = 500, description = "Blob store failure", body = ErrorSchema)
    ),
    tags = ["images"],
    operation_id = "fetchImage"
)]
#[get("/images/{key}")]
pub async fn fetch_image(
    state: web::Data<HttpState>,
    key: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let key = BlobKey::new(key.into_inner()).map_err(|_| Error::not_found("Image not found."))?;
    let blob = state.users_query.fetch_image(&key).await?;
    Ok(HttpResponse::Ok()
        .content_type(blob.content_type)
        .insert_header(CacheControl(vec![
            CacheDirective::Public,
            CacheDirective::MaxAge(IMAGE_MAX_AGE_SECS),
        ]))
        .body(blob.bytes))
}
