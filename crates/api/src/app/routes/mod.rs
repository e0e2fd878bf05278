//! HTTP routes, grouped by area.
//!
//! Every route here sits behind the auth middleware; `/health` is mounted
//! separately in `app::build_router`.

use axum::{Router, routing::get};

pub mod bookings;
pub mod notifications;
pub mod realtime;
pub mod system;
pub mod tours;

pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/realtime", get(realtime::realtime))
        .merge(bookings::router())
        .merge(tours::router())
        .merge(notifications::router())
}
