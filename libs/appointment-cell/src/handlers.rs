use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Form, Json,
};
use axum_extra::TypedHeader;
use chrono::Utc;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{BookAppointmentForm, BookingError, ConfirmationOutcome};
use crate::services::{booking::BookingService, confirmation::ConfirmationService};

fn booking_error(error: BookingError) -> AppError {
    match error {
        BookingError::MissingFields
        | BookingError::InvalidDateTime
        | BookingError::StartNotBeforeEnd
        | BookingError::DateInPast
        | BookingError::BeyondHorizon
        | BookingError::RecurringNotSupported
        | BookingError::SlotUnavailable
        | BookingError::InvalidConfirmationLink => AppError::BadRequest(error.to_string()),
        BookingError::DoctorNotFound | BookingError::ClientNotFound => {
            AppError::NotFound(error.to_string())
        }
        BookingError::Database(msg) => AppError::Database(msg),
    }
}

fn require_self(user: &User, owner_id: &str) -> Result<(), AppError> {
    if user.id != owner_id {
        return Err(AppError::Auth(
            "Not authorized to view these appointments".to_string(),
        ));
    }
    Ok(())
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Form(form): Form<BookAppointmentForm>,
) -> Result<Json<Value>, AppError> {
    let booking_service = BookingService::new(&state);
    let appointment = booking_service
        .book(&user.id, &form, Utc::now().date_naive(), auth.token())
        .await
        .map_err(booking_error)?;

    Ok(Json(json!({
        "status": "success",
        "message": "Appointment booked. Please check your email to confirm.",
        "appointment": appointment
    })))
}

/// Public endpoint. The signed token in the path is the only credential.
#[axum::debug_handler]
pub async fn confirm_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(token): Path<String>,
) -> Result<Json<Value>, AppError> {
    let confirmation_service = ConfirmationService::new(&state);
    let outcome = confirmation_service
        .confirm(&token)
        .await
        .map_err(booking_error)?;

    let message = match outcome {
        ConfirmationOutcome::Confirmed => "Your appointment has been successfully confirmed.",
        ConfirmationOutcome::AlreadyConfirmed => "This appointment is already confirmed.",
    };

    Ok(Json(json!({
        "status": "success",
        "message": message
    })))
}

#[axum::debug_handler]
pub async fn list_doctor_appointments(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_self(&user, &doctor_id)?;

    let now = Utc::now();
    let booking_service = BookingService::new(&state);
    let overview = booking_service
        .list_for_doctor(&doctor_id, now.date_naive(), now.time(), auth.token())
        .await
        .map_err(booking_error)?;

    Ok(Json(json!(overview)))
}

#[axum::debug_handler]
pub async fn list_client_appointments(
    State(state): State<Arc<AppConfig>>,
    Path(client_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_self(&user, &client_id)?;

    let now = Utc::now();
    let booking_service = BookingService::new(&state);
    let overview = booking_service
        .list_for_client(&client_id, now.date_naive(), now.time(), auth.token())
        .await
        .map_err(booking_error)?;

    Ok(Json(json!(overview)))
}
