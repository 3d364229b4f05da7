use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub token_signing_secret: String,
    pub mail_api_url: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            token_signing_secret: "test-token-signing-secret".to_string(),
            mail_api_url: String::new(),
        }
    }
}

impl TestConfig {
    pub fn with_supabase_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Default::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            token_signing_secret: self.token_signing_secret.clone(),
            confirmation_base_url: "http://localhost:3000".to_string(),
            mail_api_url: self.mail_api_url.clone(),
            mail_api_key: "test-mail-key".to_string(),
            mail_from_address: "clinic@example.com".to_string(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "client".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn client(email: &str) -> Self {
        Self::new(email, "client")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn doctor_response(doctor_id: &str, username: &str, full_name: &str) -> serde_json::Value {
        json!({
            "id": doctor_id,
            "username": username,
            "full_name": full_name,
            "gender": "female",
            "contact": "+40 700 000 000",
            "address": "12 Clinic Street",
            "clinic_hospital": "Central Clinic",
            "monday_start": "09:00",
            "monday_end": "12:00",
            "tuesday_start": null,
            "tuesday_end": null,
            "wednesday_start": null,
            "wednesday_end": null,
            "thursday_start": null,
            "thursday_end": null,
            "friday_start": null,
            "friday_end": null
        })
    }

    pub fn client_response(client_id: &str, full_name: &str) -> serde_json::Value {
        json!({
            "id": client_id,
            "full_name": full_name,
            "gender": "male",
            "contact": "+40 700 111 111",
            "address": "3 Patient Road",
            "date_of_birth": "1990-01-01",
            "email": "client@example.com"
        })
    }

    pub fn slot_response(
        slot_id: &str,
        doctor_id: &str,
        day: &str,
        start_time: &str,
        end_time: &str,
        first_week_reserved: bool,
        second_week_reserved: bool,
    ) -> serde_json::Value {
        json!({
            "id": slot_id,
            "doctor_id": doctor_id,
            "day": day,
            "start_time": start_time,
            "end_time": end_time,
            "first_week_reserved": first_week_reserved,
            "second_week_reserved": second_week_reserved
        })
    }

    pub fn appointment_response(
        appointment_id: &str,
        doctor_id: &str,
        client_id: &str,
        start_date: &str,
        confirmed: bool,
    ) -> serde_json::Value {
        json!({
            "id": appointment_id,
            "doctor_id": doctor_id,
            "doctor_name": "Dr. Test Doctor",
            "doctor_gender": "female",
            "doctor_contact": "+40 700 000 000",
            "doctor_address": "12 Clinic Street",
            "doctor_clinic": "Central Clinic",
            "client_id": client_id,
            "client_name": "Test Client",
            "client_gender": "male",
            "client_contact": "+40 700 111 111",
            "client_address": "3 Patient Road",
            "client_date_of_birth": "1990-01-01",
            "start_date": start_date,
            "start_time": "09:00:00",
            "end_time": "09:30:00",
            "duration_minutes": 30,
            "confirmed": confirmed,
            "one_time_only": true,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }
}
