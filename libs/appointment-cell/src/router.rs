use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    let protected = Router::new()
        .route("/", post(handlers::book_appointment))
        .route("/doctor/{doctor_id}", get(handlers::list_doctor_appointments))
        .route("/client/{client_id}", get(handlers::list_client_appointments))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Confirmation links arrive from mail clients with no session attached.
    let public = Router::new().route("/confirm/{token}", get(handlers::confirm_appointment));

    protected.merge(public).with_state(state)
}
