use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

#[derive(Error, Debug, PartialEq)]
pub enum TokenError {
    #[error("Malformed token")]
    Malformed,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token expired")]
    Expired,
}

/// URL-safe, time-limited token signer. The signature is an HMAC-SHA256
/// over `salt.value.timestamp`, so tokens issued under one salt are not
/// accepted under another. Key, salt and max age come from process-wide
/// configuration and are fixed for the lifetime of the signer.
pub struct TokenSigner {
    secret: String,
    salt: String,
    max_age_seconds: i64,
}

impl TokenSigner {
    pub fn new(secret: &str, salt: &str, max_age_seconds: i64) -> Self {
        Self {
            secret: secret.to_string(),
            salt: salt.to_string(),
            max_age_seconds,
        }
    }

    pub fn sign(&self, value: &str) -> String {
        self.sign_at(value, Utc::now().timestamp())
    }

    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    pub fn sign_at(&self, value: &str, issued_at: i64) -> String {
        let value_b64 = URL_SAFE_NO_PAD.encode(value.as_bytes());
        let ts_b64 = URL_SAFE_NO_PAD.encode(issued_at.to_string().as_bytes());
        let signing_input = format!("{}.{}", value_b64, ts_b64);
        let signature = URL_SAFE_NO_PAD.encode(self.signature_for(&signing_input));
        format!("{}.{}", signing_input, signature)
    }

    pub fn verify_at(&self, token: &str, now: i64) -> Result<String, TokenError> {
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 {
            return Err(TokenError::Malformed);
        }

        let signing_input = format!("{}.{}", parts[0], parts[1]);
        let signature = URL_SAFE_NO_PAD
            .decode(parts[2])
            .map_err(|_| TokenError::Malformed)?;

        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| TokenError::InvalidSignature)?;
        mac.update(self.salt.as_bytes());
        mac.update(b".");
        mac.update(signing_input.as_bytes());
        if mac.verify_slice(&signature).is_err() {
            debug!("Token signature verification failed");
            return Err(TokenError::InvalidSignature);
        }

        let issued_at: i64 = String::from_utf8(
            URL_SAFE_NO_PAD
                .decode(parts[1])
                .map_err(|_| TokenError::Malformed)?,
        )
        .map_err(|_| TokenError::Malformed)?
        .parse()
        .map_err(|_| TokenError::Malformed)?;

        if now - issued_at > self.max_age_seconds {
            debug!("Token issued at {} rejected at {}", issued_at, now);
            return Err(TokenError::Expired);
        }

        let value = URL_SAFE_NO_PAD
            .decode(parts[0])
            .map_err(|_| TokenError::Malformed)?;
        String::from_utf8(value).map_err(|_| TokenError::Malformed)
    }

    fn signature_for(&self, signing_input: &str) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(self.salt.as_bytes());
        mac.update(b".");
        mac.update(signing_input.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}
