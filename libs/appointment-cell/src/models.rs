use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// A booked appointment. Doctor and client fields are copied at booking
/// time; later profile edits do not rewrite history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,

    pub doctor_id: Uuid,
    pub doctor_name: String,
    pub doctor_gender: Option<String>,
    pub doctor_contact: Option<String>,
    pub doctor_address: Option<String>,
    pub doctor_clinic: Option<String>,

    pub client_id: Uuid,
    pub client_name: String,
    pub client_gender: Option<String>,
    pub client_contact: Option<String>,
    pub client_address: Option<String>,
    pub client_date_of_birth: Option<NaiveDate>,

    pub start_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub duration_minutes: i64,
    pub confirmed: bool,
    pub one_time_only: bool,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    /// Still upcoming relative to the given instant.
    pub fn is_active(&self, today: NaiveDate, now_time: NaiveTime) -> bool {
        self.start_date > today || (self.start_date == today && self.end_time > now_time)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub full_name: String,
    pub gender: Option<String>,
    pub contact: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub email: Option<String>,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

/// Raw booking form. Everything is optional at the wire level so missing
/// fields surface as a validation error rather than a rejected request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookAppointmentForm {
    pub doctor_id: Option<String>,
    pub start_date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub clinic: Option<String>,
    pub one_time: Option<String>,
    pub repeat_every: Option<String>,
    pub repeat_unit: Option<String>,
    pub end_date: Option<String>,
}

impl BookAppointmentForm {
    /// The checkbox convention: "on" means checked.
    pub fn is_one_time(&self) -> bool {
        self.one_time.as_deref() == Some("on")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppointmentsOverview {
    pub appointments: Vec<AppointmentSummary>,
    pub total_appointments: usize,
    pub active_appointments: usize,
    pub finished_appointments: usize,
    pub current_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppointmentSummary {
    pub id: Uuid,
    pub doctor_name: String,
    pub client_name: String,
    pub start_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub duration_minutes: i64,
    pub confirmed: bool,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfirmationOutcome {
    Confirmed,
    AlreadyConfirmed,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum BookingError {
    #[error("All required fields must be provided.")]
    MissingFields,

    #[error("Invalid date or time format.")]
    InvalidDateTime,

    #[error("Start time must be earlier than end time.")]
    StartNotBeforeEnd,

    #[error("Selected date is in the past.")]
    DateInPast,

    #[error("Selected date is beyond the reservation period (14 days).")]
    BeyondHorizon,

    #[error("The selected slot does not exist.")]
    SlotUnavailable,

    #[error("Recurring appointments are not yet implemented. One time must be checked")]
    RecurringNotSupported,

    #[error("Doctor profile not found.")]
    DoctorNotFound,

    #[error("Client profile not found.")]
    ClientNotFound,

    #[error("Invalid or expired confirmation link.")]
    InvalidConfirmationLink,

    #[error("Database error: {0}")]
    Database(String),
}
