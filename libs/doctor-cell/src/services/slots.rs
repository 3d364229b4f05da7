use std::collections::{BTreeMap, HashSet};

use chrono::NaiveTime;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_utils::calendar::{format_24h, parse_hhmm};

use crate::models::{
    CreateSlotRequest, CreatedSlot, Doctor, Slot, SlotError, SlotListEntry,
    UpdateAvailabilityWindowsRequest,
};

pub struct SlotService {
    supabase: SupabaseClient,
}

impl SlotService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn get_doctor(&self, doctor_id: &str, auth_token: &str) -> Result<Doctor, SlotError> {
        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        self.fetch_doctor(&path, auth_token).await
    }

    pub async fn get_doctor_by_username(
        &self,
        username: &str,
        auth_token: &str,
    ) -> Result<Doctor, SlotError> {
        let path = format!("/rest/v1/doctors?username=eq.{}", username);
        self.fetch_doctor(&path, auth_token).await
    }

    async fn fetch_doctor(&self, path: &str, auth_token: &str) -> Result<Doctor, SlotError> {
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(|e| SlotError::Database(e.to_string()))?;

        let doctor = result
            .into_iter()
            .next()
            .ok_or(SlotError::DoctorNotFound)?;

        serde_json::from_value(doctor).map_err(|e| SlotError::Database(e.to_string()))
    }

    /// Fill every configured weekday window with consecutive fixed-length
    /// slots. Existing slots are left untouched so their reservation flags
    /// survive regeneration; only newly created slots are reported.
    pub async fn generate_slots(
        &self,
        doctor_id: &str,
        duration_minutes: i64,
        auth_token: &str,
    ) -> Result<Vec<CreatedSlot>, SlotError> {
        if duration_minutes <= 0 {
            return Err(SlotError::InvalidDuration);
        }

        let doctor = self.get_doctor(doctor_id, auth_token).await?;

        // Parse every configured window up front: a malformed stored time
        // aborts the whole call before any write.
        let mut windows: Vec<(&'static str, NaiveTime, NaiveTime)> = Vec::new();
        for (day, window) in doctor.weekday_windows() {
            if let Some((start, end)) = window {
                let start = parse_hhmm(&start).map_err(|_| SlotError::InvalidTimeFormat)?;
                let end = parse_hhmm(&end).map_err(|_| SlotError::InvalidTimeFormat)?;
                windows.push((day, start, end));
            }
        }

        let existing = self.get_slots(doctor_id, auth_token).await?;
        let existing_keys: HashSet<(String, NaiveTime, NaiveTime)> = existing
            .into_iter()
            .map(|slot| (slot.day, slot.start_time, slot.end_time))
            .collect();

        let mut created = Vec::new();
        let mut rows = Vec::new();

        for (day, window_start, window_end) in windows {
            for (slot_start, slot_end) in tile_window(window_start, window_end, duration_minutes) {
                if existing_keys.contains(&(day.to_string(), slot_start, slot_end)) {
                    continue;
                }

                rows.push(json!({
                    "doctor_id": doctor_id,
                    "day": day,
                    "start_time": slot_start.format("%H:%M:%S").to_string(),
                    "end_time": slot_end.format("%H:%M:%S").to_string(),
                    "first_week_reserved": false,
                    "second_week_reserved": false,
                }));
                created.push(CreatedSlot {
                    day: day.to_string(),
                    start_time: format_24h(slot_start),
                    end_time: format_24h(slot_end),
                });
            }
        }

        if !rows.is_empty() {
            let _: Vec<Value> = self
                .supabase
                .request_with_headers(
                    Method::POST,
                    "/rest/v1/slots",
                    Some(auth_token),
                    Some(Value::Array(rows)),
                    Some(SupabaseClient::returning_representation()),
                )
                .await
                .map_err(|e| SlotError::Database(e.to_string()))?;
        }

        debug!("Generated {} new slots for doctor {}", created.len(), doctor_id);
        Ok(created)
    }

    pub async fn get_slots(&self, doctor_id: &str, auth_token: &str) -> Result<Vec<Slot>, SlotError> {
        let path = format!(
            "/rest/v1/slots?doctor_id=eq.{}&order=day.asc,start_time.asc",
            doctor_id
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SlotError::Database(e.to_string()))?;

        result
            .into_iter()
            .map(|slot| serde_json::from_value(slot).map_err(|e| SlotError::Database(e.to_string())))
            .collect()
    }

    /// Slots grouped by weekday name, ordered by day then start time.
    pub async fn list_slots_by_day(
        &self,
        doctor_id: &str,
        auth_token: &str,
    ) -> Result<BTreeMap<String, Vec<SlotListEntry>>, SlotError> {
        let slots = self.get_slots(doctor_id, auth_token).await?;

        let mut by_day: BTreeMap<String, Vec<SlotListEntry>> = BTreeMap::new();
        for slot in slots {
            by_day.entry(slot.day.clone()).or_default().push(SlotListEntry {
                id: slot.id,
                start_time: format_24h(slot.start_time),
                end_time: format_24h(slot.end_time),
                first_week_reserved: slot.first_week_reserved,
                second_week_reserved: slot.second_week_reserved,
            });
        }

        Ok(by_day)
    }

    pub async fn slots_exist(&self, doctor_id: &str, auth_token: &str) -> Result<bool, SlotError> {
        let path = format!("/rest/v1/slots?doctor_id=eq.{}&limit=1", doctor_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SlotError::Database(e.to_string()))?;

        Ok(!result.is_empty())
    }

    /// Insert a single hand-placed slot, rejecting overlaps with any
    /// existing slot on the same doctor/day.
    pub async fn create_manual_slot(
        &self,
        doctor_id: &str,
        request: CreateSlotRequest,
        auth_token: &str,
    ) -> Result<Slot, SlotError> {
        let start = parse_hhmm(&request.start_time).map_err(|_| SlotError::InvalidTimeFormat)?;
        let end = parse_hhmm(&request.end_time).map_err(|_| SlotError::InvalidTimeFormat)?;

        if start >= end {
            return Err(SlotError::StartNotBeforeEnd);
        }

        let path = format!(
            "/rest/v1/slots?doctor_id=eq.{}&day=eq.{}&start_time=lt.{}&end_time=gt.{}",
            doctor_id,
            request.day,
            end.format("%H:%M:%S"),
            start.format("%H:%M:%S"),
        );
        let overlapping: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SlotError::Database(e.to_string()))?;

        if !overlapping.is_empty() {
            return Err(SlotError::Overlap);
        }

        let row = json!({
            "doctor_id": doctor_id,
            "day": request.day,
            "start_time": start.format("%H:%M:%S").to_string(),
            "end_time": end.format("%H:%M:%S").to_string(),
            "first_week_reserved": false,
            "second_week_reserved": false,
        });

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/slots",
                Some(auth_token),
                Some(row),
                Some(SupabaseClient::returning_representation()),
            )
            .await
            .map_err(|e| SlotError::Database(e.to_string()))?;

        let slot = result
            .into_iter()
            .next()
            .ok_or_else(|| SlotError::Database("Failed to create slot".to_string()))?;

        serde_json::from_value(slot).map_err(|e| SlotError::Database(e.to_string()))
    }

    pub async fn delete_all_slots(&self, doctor_id: &str, auth_token: &str) -> Result<(), SlotError> {
        let path = format!("/rest/v1/slots?doctor_id=eq.{}", doctor_id);
        let _: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::DELETE,
                &path,
                Some(auth_token),
                None,
                Some(SupabaseClient::returning_representation()),
            )
            .await
            .map_err(|e| SlotError::Database(e.to_string()))?;

        Ok(())
    }

    pub async fn delete_slot(
        &self,
        doctor_id: &str,
        slot_id: &str,
        auth_token: &str,
    ) -> Result<(), SlotError> {
        let path = format!("/rest/v1/slots?id=eq.{}&doctor_id=eq.{}", slot_id, doctor_id);
        let deleted: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::DELETE,
                &path,
                Some(auth_token),
                None,
                Some(SupabaseClient::returning_representation()),
            )
            .await
            .map_err(|e| SlotError::Database(e.to_string()))?;

        if deleted.is_empty() {
            return Err(SlotError::SlotNotFound);
        }

        Ok(())
    }

    /// Patch the doctor's standing weekday windows. Provided values must
    /// parse as 24-hour `HH:MM`; absent fields are left unchanged.
    pub async fn update_availability_windows(
        &self,
        doctor_id: &str,
        request: UpdateAvailabilityWindowsRequest,
        auth_token: &str,
    ) -> Result<Doctor, SlotError> {
        let mut update_data = serde_json::Map::new();
        for (field, value) in request.fields() {
            if let Some(value) = value {
                if !value.is_empty() {
                    parse_hhmm(value).map_err(|_| SlotError::InvalidTimeFormat)?;
                }
                update_data.insert(field.to_string(), json!(value));
            }
        }

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(Value::Object(update_data)),
                Some(SupabaseClient::returning_representation()),
            )
            .await
            .map_err(|e| SlotError::Database(e.to_string()))?;

        let doctor = result
            .into_iter()
            .next()
            .ok_or(SlotError::DoctorNotFound)?;

        serde_json::from_value(doctor).map_err(|e| SlotError::Database(e.to_string()))
    }
}

/// Non-overlapping `duration`-minute intervals filling `[start, end)`.
/// A final partial interval that would overshoot `end` is discarded.
pub fn tile_window(
    start: NaiveTime,
    end: NaiveTime,
    duration_minutes: i64,
) -> Vec<(NaiveTime, NaiveTime)> {
    use chrono::Timelike;

    // All arithmetic stays in i64: durations larger than the window (or
    // than a day) must fall out of the loop, not wrap through a cast.
    let duration_secs = duration_minutes.saturating_mul(60);
    if duration_secs <= 0 {
        return Vec::new();
    }
    let end_secs = i64::from(end.num_seconds_from_midnight());

    let mut slots = Vec::new();
    let mut current = i64::from(start.num_seconds_from_midnight());

    while duration_secs <= end_secs - current {
        let slot_start = NaiveTime::from_num_seconds_from_midnight_opt(current as u32, 0);
        let slot_end =
            NaiveTime::from_num_seconds_from_midnight_opt((current + duration_secs) as u32, 0);
        match (slot_start, slot_end) {
            (Some(s), Some(e)) => slots.push((s, e)),
            _ => break,
        }
        current += duration_secs;
    }

    slots
}
