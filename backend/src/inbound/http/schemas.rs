//! OpenAPI schema definitions for domain types.
//!
//! Domain types stay free of utoipa derives; these mirrors register their
//! shape under the domain names instead.

use utoipa::ToSchema;

/// OpenAPI schema for [`crate::domain::ErrorCode`].
#[derive(ToSchema)]
#[schema(as = crate::domain::ErrorCode)]
pub enum ErrorCodeSchema {
    /// Missing fields, undecodable payloads or a duplicate email.
    #[schema(rename = "invalid_request")]
    InvalidRequest,
    /// No record or image under the given identifier.
    #[schema(rename = "not_found")]
    NotFound,
    /// The collection does not support the request method.
    #[schema(rename = "method_not_allowed")]
    MethodNotAllowed,
    /// A store failed; details stay in the server logs.
    #[schema(rename = "internal_error")]
    InternalError,
}

/// OpenAPI schema for [`crate::domain::Error`].
#[derive(ToSchema)]
#[schema(as = crate::domain::Error, rename_all = "camelCase")]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct ErrorSchema {
    /// Stable machine-readable error code.
    #[schema(example = "invalid_request")]
    code: ErrorCodeSchema,
    /// Human-readable message.
    #[schema(example = "Missing required fields: name, email, or image.")]
    message: String,
    /// Request correlation identifier, echoed in the `trace-id` header.
    #[schema(example = "6f9619ff-8b86-d011-b42d-00c04fc964ff")]
    trace_id: Option<String>,
    /// Machine-readable detail such as `{"code": "duplicate_email"}`.
    details: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use utoipa::PartialSchema;

    fn schema_to_json<T: PartialSchema>() -> String {
        serde_json::to_string(&T::schema()).expect("schema serialises to JSON")
    }

    #[rstest]
    fn error_schema_uses_wire_field_names() {
        assert_eq!(ErrorSchema::name(), "crate.domain.Error");
        let schema_json = schema_to_json::<ErrorSchema>();
        assert!(schema_json.contains("traceId"));
        assert!(schema_json.contains("details"));
    }

    #[rstest]
    #[case("invalid_request")]
    #[case("not_found")]
    #[case("method_not_allowed")]
    #[case("internal_error")]
    fn error_code_schema_lists_every_code(#[case] code: &str) {
        assert_eq!(ErrorCodeSchema::name(), "crate.domain.ErrorCode");
        assert!(schema_to_json::<ErrorCodeSchema>().contains(code));
    }
}
