use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};

use tourbook_core::NotificationId;
use tourbook_infra::NotificationStore;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/unread-count", get(unread_count))
        .route("/notifications/read-all", post(mark_all_read))
        .route("/notifications/:id/read", post(mark_read))
        .route("/notifications/:id", delete(delete_notification))
}

/// GET /notifications?unread=true
///
/// Newest first. Always scoped to the caller's own inbox.
pub async fn list_notifications(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::NotificationsQuery>,
) -> axum::response::Response {
    match services
        .notifications
        .list_for_recipient(principal.user_id(), query.unread)
        .await
    {
        Ok(items) => Json(items).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn unread_count(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    match services.notifications.unread_count(principal.user_id()).await {
        Ok(unread) => Json(dto::UnreadCountResponse { unread }).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn mark_read(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let notification_id: NotificationId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services
        .notifications
        .mark_read(notification_id, principal.user_id())
        .await
    {
        Ok(notification) => Json(notification).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn mark_all_read(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    match services.notifications.mark_all_read(principal.user_id()).await {
        Ok(updated) => Json(dto::MarkAllReadResponse { updated }).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_notification(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let notification_id: NotificationId = match dto::parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services
        .notifications
        .delete(notification_id, principal.user_id())
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
