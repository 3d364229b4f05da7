use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    /// Key for the HMAC-signed appointment confirmation links.
    pub token_signing_secret: String,
    /// Base URL prefixed to confirmation links placed in outbound mail.
    pub confirmation_base_url: String,
    pub mail_api_url: String,
    pub mail_api_key: String,
    pub mail_from_address: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            token_signing_secret: env::var("TOKEN_SIGNING_SECRET")
                .unwrap_or_else(|_| {
                    warn!("TOKEN_SIGNING_SECRET not set, using empty value");
                    String::new()
                }),
            confirmation_base_url: env::var("CONFIRMATION_BASE_URL")
                .unwrap_or_else(|_| {
                    warn!("CONFIRMATION_BASE_URL not set, using default");
                    "http://localhost:3000".to_string()
                }),
            mail_api_url: env::var("MAIL_API_URL")
                .unwrap_or_else(|_| {
                    warn!("MAIL_API_URL not set, using empty value");
                    String::new()
                }),
            mail_api_key: env::var("MAIL_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("MAIL_API_KEY not set, using empty value");
                    String::new()
                }),
            mail_from_address: env::var("MAIL_FROM_ADDRESS")
                .unwrap_or_else(|_| {
                    warn!("MAIL_FROM_ADDRESS not set, using default");
                    "noreply@clinic.example".to_string()
                }),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
            && !self.token_signing_secret.is_empty()
    }

    pub fn is_mail_configured(&self) -> bool {
        !self.mail_api_url.is_empty() && !self.mail_api_key.is_empty()
    }
}
