use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_utils::signed_token::TokenSigner;

use crate::models::{Appointment, BookingError, ConfirmationOutcome};

pub const CONFIRMATION_SALT: &str = "appointment-confirmation";
pub const CONFIRMATION_MAX_AGE_SECONDS: i64 = 3600;

/// The one signer that mints and accepts confirmation links. Links expire
/// one hour after the booking mail is sent.
pub fn confirmation_signer(secret: &str) -> TokenSigner {
    TokenSigner::new(secret, CONFIRMATION_SALT, CONFIRMATION_MAX_AGE_SECONDS)
}

pub struct ConfirmationService {
    supabase: SupabaseClient,
    signing_secret: String,
}

impl ConfirmationService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            signing_secret: config.token_signing_secret.clone(),
        }
    }

    /// Resolve a confirmation token and mark the appointment confirmed.
    /// Anyone holding a valid link may confirm, so this runs without a
    /// user token. Confirming twice is not an error. A bad signature, an
    /// expired token and a token for an appointment that no longer exists
    /// all surface as the same invalid-link error; the caller is never
    /// told which one it was.
    pub async fn confirm(&self, token: &str) -> Result<ConfirmationOutcome, BookingError> {
        let appointment_id = confirmation_signer(&self.signing_secret)
            .verify(token)
            .map_err(|e| {
                debug!("Rejected confirmation token: {}", e);
                BookingError::InvalidConfirmationLink
            })?;

        let appointment = self.get_appointment(&appointment_id).await?;

        if appointment.confirmed {
            info!("Appointment {} was already confirmed", appointment.id);
            return Ok(ConfirmationOutcome::AlreadyConfirmed);
        }

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment.id);
        let updated: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                None,
                Some(json!({ "confirmed": true })),
                Some(SupabaseClient::returning_representation()),
            )
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;

        if updated.is_empty() {
            debug!("Appointment {} vanished before confirmation", appointment.id);
            return Err(BookingError::InvalidConfirmationLink);
        }

        info!("Appointment {} confirmed", appointment.id);
        Ok(ConfirmationOutcome::Confirmed)
    }

    async fn get_appointment(&self, appointment_id: &str) -> Result<Appointment, BookingError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;

        let appointment = result.into_iter().next().ok_or_else(|| {
            debug!("No appointment matches id {}", appointment_id);
            BookingError::InvalidConfirmationLink
        })?;
        serde_json::from_value(appointment).map_err(|e| BookingError::Database(e.to_string()))
    }
}
