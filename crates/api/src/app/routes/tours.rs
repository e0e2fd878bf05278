use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    response::IntoResponse,
    routing::{get, put},
};

use tourbook_core::TourId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/tours/:id", put(sync_tour))
        .route("/tours/:id/availability", get(availability))
}

/// PUT /tours/:id
///
/// Catalog hook: creates the tour's counter or applies a new price and
/// capacity. Staff/admin only.
pub async fn sync_tour(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::SyncTourRequest>,
) -> axum::response::Response {
    let tour_id: TourId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services
        .bookings
        .sync_tour(principal.principal(), tour_id, body.price, body.max_seats)
        .await
    {
        Ok(tour) => Json(dto::AvailabilityResponse::from(tour)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn availability(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let tour_id: TourId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.bookings.tour(tour_id).await {
        Ok(tour) => Json(dto::AvailabilityResponse::from(tour)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
