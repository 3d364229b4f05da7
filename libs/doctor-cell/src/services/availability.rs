use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use tracing::debug;

use shared_config::AppConfig;
use shared_utils::calendar::{day_offset, format_12h, format_24h, horizon_dates, weekday_name, week_of_offset};

use crate::models::{AvailableSlotView, Slot, SlotError};
use crate::services::slots::SlotService;

pub struct AvailabilityService {
    slots: SlotService,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            slots: SlotService::new(config),
        }
    }

    pub async fn two_week_availability_by_username(
        &self,
        username: &str,
        horizon_start: NaiveDate,
        auth_token: &str,
    ) -> Result<BTreeMap<String, Vec<AvailableSlotView>>, SlotError> {
        let doctor = self.slots.get_doctor_by_username(username, auth_token).await?;
        self.two_week_availability(&doctor.id.to_string(), horizon_start, auth_token)
            .await
    }

    /// Free slot windows for each of the next 14 dates. Week-1 dates hide
    /// slots with `first_week_reserved` set, week-2 dates those with
    /// `second_week_reserved`; a date with no matching slots maps to an
    /// empty list.
    pub async fn two_week_availability(
        &self,
        doctor_id: &str,
        horizon_start: NaiveDate,
        auth_token: &str,
    ) -> Result<BTreeMap<String, Vec<AvailableSlotView>>, SlotError> {
        let slots = self.slots.get_slots(doctor_id, auth_token).await?;

        let mut by_day: HashMap<&str, Vec<&Slot>> = HashMap::new();
        for slot in &slots {
            by_day.entry(slot.day.as_str()).or_default().push(slot);
        }

        let mut by_date = BTreeMap::new();
        for date in horizon_dates(horizon_start) {
            let week = week_of_offset(day_offset(horizon_start, date)).unwrap_or(2);
            let day = weekday_name(date);

            let mut available: Vec<AvailableSlotView> = by_day
                .get(day)
                .map(|day_slots| {
                    day_slots
                        .iter()
                        .filter(|slot| match week {
                            1 => !slot.first_week_reserved,
                            _ => !slot.second_week_reserved,
                        })
                        .map(|slot| AvailableSlotView {
                            start_time: format_12h(slot.start_time),
                            end_time: format_12h(slot.end_time),
                            start_time_24h: format_24h(slot.start_time),
                            end_time_24h: format_24h(slot.end_time),
                        })
                        .collect()
                })
                .unwrap_or_default();

            available.sort_by(|a, b| a.start_time_24h.cmp(&b.start_time_24h));
            by_date.insert(date.format("%Y-%m-%d").to_string(), available);
        }

        debug!("Computed two-week availability for doctor {}", doctor_id);
        Ok(by_date)
    }
}
