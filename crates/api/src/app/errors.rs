use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::{Value as JsonValue, json};

use tourbook_core::DomainError;
use tourbook_infra::ServiceError;

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Domain(err) => domain_error_to_response(err),
        ServiceError::Store(err) => {
            tracing::error!(error = %err, "storage failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "store_error",
                "storage backend failure",
            )
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        DomainError::Validation(_) => json_error(StatusCode::BAD_REQUEST, "validation_error", message),
        DomainError::InvalidId(_) => json_error(StatusCode::BAD_REQUEST, "invalid_id", message),
        DomainError::NotFound { entity } => json_error_with(
            StatusCode::NOT_FOUND,
            "not_found",
            message,
            json!({ "entity": entity }),
        ),
        DomainError::Forbidden(_) => json_error(StatusCode::FORBIDDEN, "forbidden", message),
        DomainError::InsufficientInventory {
            tour_id,
            requested,
            available,
        } => json_error_with(
            StatusCode::CONFLICT,
            "insufficient_inventory",
            message,
            json!({
                "tour_id": tour_id,
                "requested": requested,
                "available": available,
            }),
        ),
        DomainError::InvalidStatus { from, to } => json_error_with(
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid_status",
            message,
            json!({ "from": from, "to": to }),
        ),
        // Soft outcome, not an error: same flag the booking routes return.
        DomainError::AlreadyCancelled { booking_id } => (
            StatusCode::OK,
            axum::Json(json!({ "already_cancelled": true, "booking_id": booking_id })),
        )
            .into_response(),
        DomainError::Conflict(_) => json_error(StatusCode::CONFLICT, "conflict", message),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    json_error_with(status, code, message, JsonValue::Null)
}

/// Like [`json_error`], with extra top-level fields merged into the body.
pub fn json_error_with(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
    details: JsonValue,
) -> axum::response::Response {
    let mut body = json!({
        "error": code,
        "message": message.into(),
    });
    if let (Some(body), JsonValue::Object(details)) = (body.as_object_mut(), details) {
        body.extend(details);
    }

    (status, axum::Json(body)).into_response()
}
