use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn doctor_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        // Slot store management
        .route("/{doctor_id}/slots/generate", post(handlers::generate_slots))
        .route("/{doctor_id}/slots", get(handlers::list_slots))
        .route("/{doctor_id}/slots", post(handlers::create_manual_slot))
        .route("/{doctor_id}/slots", delete(handlers::delete_all_slots))
        .route("/{doctor_id}/slots/exists", get(handlers::check_slots))
        .route("/{doctor_id}/slots/{slot_id}", delete(handlers::delete_slot))

        // Standing weekday windows
        .route("/{doctor_id}/availability", put(handlers::update_availability_windows))

        // Rolling two-week availability
        .route("/{doctor_id}/two-week-availability", get(handlers::two_week_availability))
        .route(
            "/by-username/{username}/two-week-availability",
            get(handlers::two_week_availability_by_username),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
