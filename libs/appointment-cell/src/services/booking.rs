use chrono::{NaiveDate, NaiveTime, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use doctor_cell::models::{Doctor, Slot};
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_utils::calendar::{day_offset, parse_hhmm, weekday_name, week_of_offset};

use crate::models::{
    Appointment, AppointmentSummary, AppointmentsOverview, BookAppointmentForm, BookingError,
    Client,
};
use crate::services::confirmation::confirmation_signer;
use crate::services::notification::MailerService;

/// A booking request that has passed every check short of the slot lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedBooking {
    pub doctor_id: String,
    pub date: NaiveDate,
    pub day: &'static str,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub clinic: String,
    pub week: u8,
    pub duration_minutes: i64,
}

/// Short-circuit validation of the raw booking form. Each failure maps to
/// its own error kind; nothing here touches the store.
pub fn validate_booking(
    form: &BookAppointmentForm,
    today: NaiveDate,
) -> Result<ValidatedBooking, BookingError> {
    let (doctor_id, date, start, end, clinic) = match (
        &form.doctor_id,
        &form.start_date,
        &form.start_time,
        &form.end_time,
        &form.clinic,
    ) {
        (Some(doctor_id), Some(date), Some(start), Some(end), Some(clinic))
            if !doctor_id.is_empty()
                && !date.is_empty()
                && !start.is_empty()
                && !end.is_empty()
                && !clinic.is_empty() =>
        {
            (doctor_id, date, start, end, clinic)
        }
        _ => return Err(BookingError::MissingFields),
    };

    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| BookingError::InvalidDateTime)?;
    let start = parse_hhmm(start).map_err(|_| BookingError::InvalidDateTime)?;
    let end = parse_hhmm(end).map_err(|_| BookingError::InvalidDateTime)?;

    if start >= end {
        return Err(BookingError::StartNotBeforeEnd);
    }

    let offset = day_offset(today, date);
    if offset < 0 {
        return Err(BookingError::DateInPast);
    }
    let week = week_of_offset(offset).ok_or(BookingError::BeyondHorizon)?;

    // Recurring bookings would mutate nothing today, so reject them before
    // the reservation flag is touched.
    if !form.is_one_time() {
        return Err(BookingError::RecurringNotSupported);
    }

    Ok(ValidatedBooking {
        doctor_id: doctor_id.clone(),
        date,
        day: weekday_name(date),
        start,
        end,
        clinic: clinic.clone(),
        week,
        duration_minutes: (end - start).num_minutes(),
    })
}

pub struct BookingService {
    supabase: SupabaseClient,
    mailer: MailerService,
    confirmation_base_url: String,
    signing_secret: String,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            mailer: MailerService::new(config),
            confirmation_base_url: config.confirmation_base_url.clone(),
            signing_secret: config.token_signing_secret.clone(),
        }
    }

    /// Book a one-time appointment for `client_id`. Reserving the slot is
    /// a single conditional update keyed on the week's reservation flag,
    /// so of two concurrent bookings for the same slot and week exactly
    /// one sees the row come back. The appointment row is committed before
    /// the confirmation mail goes out; mail failure never unwinds it.
    pub async fn book(
        &self,
        client_id: &str,
        form: &BookAppointmentForm,
        today: NaiveDate,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        let booking = validate_booking(form, today)?;

        let doctor = self.get_doctor(&booking.doctor_id, auth_token).await?;
        let client = self.get_client(client_id, auth_token).await?;

        let slot = self.reserve_slot(&booking, auth_token).await?;

        let appointment = match self.create_appointment(&booking, &doctor, &client, auth_token).await {
            Ok(appointment) => appointment,
            Err(e) => {
                // The flag was flipped but the appointment never landed;
                // release the reservation so the slot is bookable again.
                self.release_slot(&slot, booking.week, auth_token).await;
                return Err(e);
            }
        };

        if let Err(e) = self.send_confirmation_mail(&appointment, &client).await {
            warn!(
                "Confirmation mail for appointment {} failed: {}",
                appointment.id, e
            );
        }

        Ok(appointment)
    }

    async fn get_doctor(&self, doctor_id: &str, auth_token: &str) -> Result<Doctor, BookingError> {
        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;

        let doctor = result.into_iter().next().ok_or(BookingError::DoctorNotFound)?;
        serde_json::from_value(doctor).map_err(|e| BookingError::Database(e.to_string()))
    }

    async fn get_client(&self, client_id: &str, auth_token: &str) -> Result<Client, BookingError> {
        let path = format!("/rest/v1/clients?id=eq.{}", client_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;

        let client = result.into_iter().next().ok_or(BookingError::ClientNotFound)?;
        serde_json::from_value(client).map_err(|e| BookingError::Database(e.to_string()))
    }

    /// Compare-and-set on the week's reservation flag. An empty result
    /// covers both "no such slot" and "already reserved" - the caller
    /// cannot tell them apart, and neither can we.
    async fn reserve_slot(
        &self,
        booking: &ValidatedBooking,
        auth_token: &str,
    ) -> Result<Slot, BookingError> {
        let flag = week_flag(booking.week);
        let path = format!(
            "/rest/v1/slots?doctor_id=eq.{}&day=eq.{}&start_time=eq.{}&end_time=eq.{}&{}=is.false",
            booking.doctor_id,
            booking.day,
            booking.start.format("%H:%M:%S"),
            booking.end.format("%H:%M:%S"),
            flag,
        );

        let reserved: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(json!({ flag: true })),
                Some(SupabaseClient::returning_representation()),
            )
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;

        let slot = reserved.into_iter().next().ok_or(BookingError::SlotUnavailable)?;
        serde_json::from_value(slot).map_err(|e| BookingError::Database(e.to_string()))
    }

    async fn release_slot(&self, slot: &Slot, week: u8, auth_token: &str) {
        let flag = week_flag(week);
        let path = format!("/rest/v1/slots?id=eq.{}", slot.id);
        let result: Result<Vec<Value>, _> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(json!({ flag: false })),
                Some(SupabaseClient::returning_representation()),
            )
            .await;

        if let Err(e) = result {
            error!("Failed to release reservation on slot {}: {}", slot.id, e);
        }
    }

    async fn create_appointment(
        &self,
        booking: &ValidatedBooking,
        doctor: &Doctor,
        client: &Client,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        let row = json!({
            "doctor_id": doctor.id,
            "doctor_name": format!("Dr. {}", doctor.full_name),
            "doctor_gender": doctor.gender,
            "doctor_contact": doctor.contact,
            "doctor_address": doctor.address,
            "doctor_clinic": doctor.clinic_hospital,

            "client_id": client.id,
            "client_name": client.full_name,
            "client_gender": client.gender,
            "client_contact": client.contact,
            "client_address": client.address,
            "client_date_of_birth": client.date_of_birth,

            "start_date": booking.date.format("%Y-%m-%d").to_string(),
            "start_time": booking.start.format("%H:%M:%S").to_string(),
            "end_time": booking.end.format("%H:%M:%S").to_string(),
            "duration_minutes": booking.duration_minutes,
            "confirmed": false,
            "one_time_only": true,
            "created_at": Utc::now().to_rfc3339(),
        });

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(auth_token),
                Some(row),
                Some(SupabaseClient::returning_representation()),
            )
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;

        let appointment = result
            .into_iter()
            .next()
            .ok_or_else(|| BookingError::Database("Failed to create appointment".to_string()))?;

        serde_json::from_value(appointment).map_err(|e| BookingError::Database(e.to_string()))
    }

    async fn send_confirmation_mail(
        &self,
        appointment: &Appointment,
        client: &Client,
    ) -> anyhow::Result<()> {
        let recipient = match &client.email {
            Some(email) => email,
            None => {
                debug!("Client {} has no email address, skipping mail", client.id);
                return Ok(());
            }
        };

        let signer = confirmation_signer(&self.signing_secret);
        let token = signer.sign(&appointment.id.to_string());
        let link = format!(
            "{}/appointments/confirm/{}",
            self.confirmation_base_url, token
        );

        let body = format!(
            "Dear {},\n\n\
             Your appointment details are as follows:\n\
             Doctor: {}\n\
             Clinic: {}\n\
             Address: {}\n\
             Date: {}\n\
             Time: {} - {}\n\
             Duration: {} minutes\n\n\
             To confirm your appointment, please click the following link:\n\
             {}\n\n\
             Thank you,\n\
             Your Clinic Team",
            appointment.client_name,
            appointment.doctor_name,
            appointment.doctor_clinic.as_deref().unwrap_or("-"),
            appointment.doctor_address.as_deref().unwrap_or("-"),
            appointment.start_date,
            appointment.start_time.format("%H:%M"),
            appointment.end_time.format("%H:%M"),
            appointment.duration_minutes,
            link,
        );

        self.mailer
            .send(recipient, "Appointment Confirmation", &body)
            .await
    }

    pub async fn list_for_doctor(
        &self,
        doctor_id: &str,
        today: NaiveDate,
        now_time: NaiveTime,
        auth_token: &str,
    ) -> Result<AppointmentsOverview, BookingError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&order=start_date.desc,start_time.desc",
            doctor_id
        );
        self.fetch_overview(&path, today, now_time, auth_token).await
    }

    pub async fn list_for_client(
        &self,
        client_id: &str,
        today: NaiveDate,
        now_time: NaiveTime,
        auth_token: &str,
    ) -> Result<AppointmentsOverview, BookingError> {
        let path = format!(
            "/rest/v1/appointments?client_id=eq.{}&order=start_date.desc,start_time.desc",
            client_id
        );
        self.fetch_overview(&path, today, now_time, auth_token).await
    }

    async fn fetch_overview(
        &self,
        path: &str,
        today: NaiveDate,
        now_time: NaiveTime,
        auth_token: &str,
    ) -> Result<AppointmentsOverview, BookingError> {
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;

        let appointments: Vec<Appointment> = result
            .into_iter()
            .map(|a| serde_json::from_value(a).map_err(|e| BookingError::Database(e.to_string())))
            .collect::<Result<_, _>>()?;

        let summaries: Vec<AppointmentSummary> = appointments
            .iter()
            .map(|a| AppointmentSummary {
                id: a.id,
                doctor_name: a.doctor_name.clone(),
                client_name: a.client_name.clone(),
                start_date: a.start_date,
                start_time: a.start_time,
                end_time: a.end_time,
                duration_minutes: a.duration_minutes,
                confirmed: a.confirmed,
                is_active: a.is_active(today, now_time),
            })
            .collect();

        let active = summaries.iter().filter(|a| a.is_active).count();

        Ok(AppointmentsOverview {
            total_appointments: summaries.len(),
            active_appointments: active,
            finished_appointments: summaries.len() - active,
            current_date: today.format("%d %b %Y").to_string(),
            appointments: summaries,
        })
    }
}

fn week_flag(week: u8) -> &'static str {
    if week == 1 {
        "first_week_reserved"
    } else {
        "second_week_reserved"
    }
}
