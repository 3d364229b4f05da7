use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// CORE DOCTOR / SLOT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub gender: Option<String>,
    pub contact: Option<String>,
    pub address: Option<String>,
    pub clinic_hospital: Option<String>,
    pub monday_start: Option<String>,
    pub monday_end: Option<String>,
    pub tuesday_start: Option<String>,
    pub tuesday_end: Option<String>,
    pub wednesday_start: Option<String>,
    pub wednesday_end: Option<String>,
    pub thursday_start: Option<String>,
    pub thursday_end: Option<String>,
    pub friday_start: Option<String>,
    pub friday_end: Option<String>,
}

impl Doctor {
    /// The standing availability window per working day. A day is only
    /// yielded with a window when both ends are set.
    pub fn weekday_windows(&self) -> Vec<(&'static str, Option<(String, String)>)> {
        let pair = |start: &Option<String>, end: &Option<String>| match (start, end) {
            (Some(s), Some(e)) if !s.is_empty() && !e.is_empty() => {
                Some((s.clone(), e.clone()))
            }
            _ => None,
        };

        vec![
            ("Monday", pair(&self.monday_start, &self.monday_end)),
            ("Tuesday", pair(&self.tuesday_start, &self.tuesday_end)),
            ("Wednesday", pair(&self.wednesday_start, &self.wednesday_end)),
            ("Thursday", pair(&self.thursday_start, &self.thursday_end)),
            ("Friday", pair(&self.friday_start, &self.friday_end)),
        ]
    }
}

/// A recurring weekly time window for a doctor, independently reservable
/// in each of the two rolling horizon weeks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub day: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub first_week_reserved: bool,
    pub second_week_reserved: bool,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSlotRequest {
    pub day: String,
    pub start_time: String,
    pub end_time: String,
}

/// Descriptor of a slot created by the generator, echoed back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedSlot {
    pub day: String,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotListEntry {
    pub id: Uuid,
    pub start_time: String,
    pub end_time: String,
    pub first_week_reserved: bool,
    pub second_week_reserved: bool,
}

/// One bookable window on a concrete date, rendered in both clock forms.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailableSlotView {
    pub start_time: String,
    pub end_time: String,
    pub start_time_24h: String,
    pub end_time_24h: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAvailabilityWindowsRequest {
    pub monday_start: Option<String>,
    pub monday_end: Option<String>,
    pub tuesday_start: Option<String>,
    pub tuesday_end: Option<String>,
    pub wednesday_start: Option<String>,
    pub wednesday_end: Option<String>,
    pub thursday_start: Option<String>,
    pub thursday_end: Option<String>,
    pub friday_start: Option<String>,
    pub friday_end: Option<String>,
}

impl UpdateAvailabilityWindowsRequest {
    pub fn fields(&self) -> Vec<(&'static str, &Option<String>)> {
        vec![
            ("monday_start", &self.monday_start),
            ("monday_end", &self.monday_end),
            ("tuesday_start", &self.tuesday_start),
            ("tuesday_end", &self.tuesday_end),
            ("wednesday_start", &self.wednesday_start),
            ("wednesday_end", &self.wednesday_end),
            ("thursday_start", &self.thursday_start),
            ("thursday_end", &self.thursday_end),
            ("friday_start", &self.friday_start),
            ("friday_end", &self.friday_end),
        ]
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum SlotError {
    #[error("Invalid data or appointment duration.")]
    InvalidDuration,

    #[error("Invalid time format.")]
    InvalidTimeFormat,

    #[error("Start time must be before end time.")]
    StartNotBeforeEnd,

    #[error("Slot overlaps with an existing one.")]
    Overlap,

    #[error("Slot not found")]
    SlotNotFound,

    #[error("Doctor profile not found.")]
    DoctorNotFound,

    #[error("Database error: {0}")]
    Database(String),
}
