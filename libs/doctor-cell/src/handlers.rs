use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::Utc;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{CreateSlotRequest, SlotError, UpdateAvailabilityWindowsRequest};
use crate::services::{availability::AvailabilityService, slots::SlotService};

fn slot_error(error: SlotError) -> AppError {
    match error {
        SlotError::InvalidDuration
        | SlotError::InvalidTimeFormat
        | SlotError::StartNotBeforeEnd
        | SlotError::Overlap => AppError::BadRequest(error.to_string()),
        SlotError::SlotNotFound | SlotError::DoctorNotFound => AppError::NotFound(error.to_string()),
        SlotError::Database(msg) => AppError::Database(msg),
    }
}

fn require_self(user: &User, doctor_id: &str) -> Result<(), AppError> {
    if user.id != doctor_id {
        return Err(AppError::Auth(
            "Not authorized to manage slots for this doctor".to_string(),
        ));
    }
    Ok(())
}

#[axum::debug_handler]
pub async fn generate_slots(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, AppError> {
    require_self(&user, &doctor_id)?;

    // Mirror lenient form clients: any non-positive or non-integer
    // duration is a plain 400, not a deserialization failure.
    let duration = body
        .get("appointment_duration")
        .and_then(Value::as_i64)
        .ok_or_else(|| AppError::BadRequest("Invalid data or appointment duration.".to_string()))?;

    let slot_service = SlotService::new(&state);
    let created = slot_service
        .generate_slots(&doctor_id, duration, auth.token())
        .await
        .map_err(slot_error)?;

    Ok(Json(json!({
        "status": "success",
        "created_slots": created
    })))
}

#[axum::debug_handler]
pub async fn list_slots(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_self(&user, &doctor_id)?;

    let slot_service = SlotService::new(&state);
    let slots = slot_service
        .list_slots_by_day(&doctor_id, auth.token())
        .await
        .map_err(slot_error)?;

    Ok(Json(json!({
        "status": "success",
        "slots": slots
    })))
}

#[axum::debug_handler]
pub async fn check_slots(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_self(&user, &doctor_id)?;

    let slot_service = SlotService::new(&state);
    let exists = slot_service
        .slots_exist(&doctor_id, auth.token())
        .await
        .map_err(slot_error)?;

    Ok(Json(json!({
        "status": "success",
        "slots_exist": exists
    })))
}

#[axum::debug_handler]
pub async fn create_manual_slot(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateSlotRequest>,
) -> Result<Json<Value>, AppError> {
    require_self(&user, &doctor_id)?;

    let slot_service = SlotService::new(&state);
    slot_service
        .create_manual_slot(&doctor_id, request, auth.token())
        .await
        .map_err(slot_error)?;

    Ok(Json(json!({
        "status": "success",
        "message": "Slot successfully created."
    })))
}

#[axum::debug_handler]
pub async fn delete_all_slots(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_self(&user, &doctor_id)?;

    let slot_service = SlotService::new(&state);
    slot_service
        .delete_all_slots(&doctor_id, auth.token())
        .await
        .map_err(slot_error)?;

    Ok(Json(json!({
        "status": "success",
        "message": "All slots deleted successfully"
    })))
}

#[axum::debug_handler]
pub async fn delete_slot(
    State(state): State<Arc<AppConfig>>,
    Path((doctor_id, slot_id)): Path<(String, String)>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_self(&user, &doctor_id)?;

    let slot_service = SlotService::new(&state);
    slot_service
        .delete_slot(&doctor_id, &slot_id, auth.token())
        .await
        .map_err(slot_error)?;

    Ok(Json(json!({
        "status": "success",
        "message": "Slot deleted successfully"
    })))
}

#[axum::debug_handler]
pub async fn update_availability_windows(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateAvailabilityWindowsRequest>,
) -> Result<Json<Value>, AppError> {
    require_self(&user, &doctor_id)?;

    let slot_service = SlotService::new(&state);
    let doctor = slot_service
        .update_availability_windows(&doctor_id, request, auth.token())
        .await
        .map_err(slot_error)?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn two_week_availability(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let availability_service = AvailabilityService::new(&state);
    let slots = availability_service
        .two_week_availability(&doctor_id, Utc::now().date_naive(), auth.token())
        .await
        .map_err(slot_error)?;

    Ok(Json(json!({
        "status": "success",
        "slots": slots
    })))
}

#[axum::debug_handler]
pub async fn two_week_availability_by_username(
    State(state): State<Arc<AppConfig>>,
    Path(username): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let availability_service = AvailabilityService::new(&state);
    let slots = availability_service
        .two_week_availability_by_username(&username, Utc::now().date_naive(), auth.token())
        .await
        .map_err(slot_error)?;

    Ok(Json(json!({
        "status": "success",
        "slots": slots
    })))
}
