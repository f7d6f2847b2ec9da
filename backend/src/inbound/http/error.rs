//! HTTP mapping for domain errors.
//!
//! The domain [`Error`] stays transport-agnostic; this module gives it a
//! status code, a JSON body and the `trace-id` header. Internal errors are
//! logged in full and reach clients only as a generic message.

use actix_web::error::{JsonPayloadError, PayloadError};
use actix_web::{HttpRequest, HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use tracing::{error, warn};

use crate::domain::{Error, ErrorCode, TRACE_ID_HEADER};

/// Result alias for handlers.
pub type ApiResult<T> = Result<T, Error>;

/// Details code for undecodable JSON bodies.
pub const INVALID_JSON_CODE: &str = "invalid_json";
/// Details code for bodies over the configured size limit.
pub const PAYLOAD_TOO_LARGE_CODE: &str = "payload_too_large";

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn redact_if_internal(error: &Error) -> Error {
    if error.code() != ErrorCode::InternalError {
        return error.clone();
    }
    let redacted = Error::internal("Internal server error");
    match error.trace_id() {
        Some(id) => redacted.with_trace_id(id.to_owned()),
        None => redacted,
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        status_for(self.code())
    }

    fn error_response(&self) -> HttpResponse {
        if self.code() == ErrorCode::InternalError {
            error!(
                trace_id = self.trace_id().unwrap_or_default(),
                message = self.message(),
                details = ?self.details(),
                "request failed with internal error"
            );
        }

        let mut builder = HttpResponse::build(self.status_code());
        if let Some(id) = self.trace_id() {
            builder.insert_header((TRACE_ID_HEADER, id.to_owned()));
        }
        builder.json(redact_if_internal(self))
    }
}

fn is_overflow(err: &JsonPayloadError) -> bool {
    matches!(
        err,
        JsonPayloadError::Overflow { .. }
            | JsonPayloadError::OverflowKnownLength { .. }
            | JsonPayloadError::Payload(PayloadError::Overflow)
    )
}

/// `JsonConfig` error handler rendering body failures as domain errors.
///
/// Keeps malformed and oversized bodies on the same `{code, message}` shape
/// as every other failure.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    warn!(error = %err, "rejected request body");
    let mapped = if is_overflow(&err) {
        Error::invalid_request("Request body is too large.")
            .with_details(json!({ "code": PAYLOAD_TOO_LARGE_CODE }))
    } else {
        Error::invalid_request("Request body must be valid JSON.")
            .with_details(json!({ "code": INVALID_JSON_CODE }))
    };
    mapped.into()
}
