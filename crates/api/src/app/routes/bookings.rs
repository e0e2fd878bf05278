use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};

use tourbook_booking::NewBooking;
use tourbook_core::{BookingId, DomainError};
use tourbook_infra::{ServiceError, ServiceResult, StoreError};
use tracing::Instrument;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/bookings", post(create_booking).get(list_own_bookings))
        .route("/bookings/:id", get(get_booking))
        .route("/bookings/:id/cancel", post(cancel_booking))
        .route("/bookings/:id/status", put(change_status))
        .route("/admin/bookings", get(list_all_bookings))
}

/// Drive a multi-step booking workflow on its own task.
///
/// Axum drops the handler future when the client disconnects; the spawned
/// task still runs reserve/insert or transition/release to the end.
pub(crate) async fn run_to_completion<F, T>(work: F) -> ServiceResult<T>
where
    F: Future<Output = ServiceResult<T>> + Send + 'static,
    T: Send + 'static,
{
    match tokio::spawn(work.in_current_span()).await {
        Ok(result) => result,
        Err(err) => Err(StoreError::backend("booking_workflow", err).into()),
    }
}

pub async fn create_booking(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<NewBooking>,
) -> axum::response::Response {
    let work = async move {
        services
            .bookings
            .create_booking(principal.principal(), body)
            .await
    };

    match run_to_completion(work).await {
        Ok(booking) => (StatusCode::CREATED, Json(booking)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_own_bookings(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    match services.bookings.list_own(principal.principal()).await {
        Ok(bookings) => Json(bookings).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// GET /admin/bookings (staff/admin only)
pub async fn list_all_bookings(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    match services.bookings.list_all(principal.principal()).await {
        Ok(bookings) => Json(bookings).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_booking(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let booking_id: BookingId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.bookings.get_booking(principal.principal(), booking_id).await {
        Ok(booking) => Json(booking).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// POST /bookings/:id/cancel
///
/// A repeat cancel answers 200 with `already_cancelled: true` and the
/// booking as it stands.
pub async fn cancel_booking(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let booking_id: BookingId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    let work = {
        let services = services.clone();
        let principal = principal.clone();
        async move {
            services
                .bookings
                .cancel_booking(principal.principal(), booking_id)
                .await
        }
    };

    match run_to_completion(work).await {
        Ok(booking) => Json(dto::CancelResponse {
            already_cancelled: false,
            booking,
        })
        .into_response(),
        Err(e) => soft_or_error(&services, &principal, booking_id, e).await,
    }
}

/// A repeat cancel is a success: answer with the booking as it stands.
/// Every other error goes through the usual mapping.
async fn soft_or_error(
    services: &AppServices,
    principal: &PrincipalContext,
    booking_id: BookingId,
    err: ServiceError,
) -> axum::response::Response {
    if !matches!(err, ServiceError::Domain(DomainError::AlreadyCancelled { .. })) {
        return errors::service_error_to_response(err);
    }

    match services.bookings.get_booking(principal.principal(), booking_id).await {
        Ok(booking) => Json(dto::CancelResponse {
            already_cancelled: true,
            booking,
        })
        .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// PUT /bookings/:id/status (staff/admin only)
///
/// Moving a cancelled booking to `cancelled` answers like a repeat cancel.
pub async fn change_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::ChangeStatusRequest>,
) -> axum::response::Response {
    let booking_id: BookingId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let target = match body.target() {
        Ok(v) => v,
        Err(res) => return res,
    };

    let work = {
        let services = services.clone();
        let principal = principal.clone();
        async move {
            services
                .bookings
                .change_status(principal.principal(), booking_id, target)
                .await
        }
    };

    match run_to_completion(work).await {
        Ok(booking) => Json(booking).into_response(),
        Err(e) => soft_or_error(&services, &principal, booking_id, e).await,
    }
}
