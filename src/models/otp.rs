//! One-time code session used to verify guest emails

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;
use validator::Validate;

/// Pending OTP for one email. Only the digest of the code is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpSession {
    pub email: String,
    pub code_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub consumed: bool,
    pub failed_attempts: u32,
}

impl OtpSession {
    pub fn issue(email: &str, code: &str, first_name: &str, last_name: &str, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            email: email.to_string(),
            code_hash: hash_code(code),
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            issued_at: now,
            expires_at: now + ttl,
            consumed: false,
            failed_attempts: 0,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn matches(&self, code: &str) -> bool {
        self.code_hash == hash_code(code.trim())
    }
}

pub fn hash_code(code: &str) -> String {
    hex::encode(Sha256::digest(code.as_bytes()))
}

/// Request a code
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SendOtpRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, max = 100, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Last name is required"))]
    pub last_name: String,
}

/// Submit a received code
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VerifyOtpRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(equal = 6, message = "Code must be 6 digits"))]
    pub code: String,
}

/// Code issued response
#[derive(Debug, Serialize, ToSchema)]
pub struct OtpIssued {
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

/// Verification result
#[derive(Debug, Serialize, ToSchema)]
pub struct OtpVerified {
    pub email: String,
    pub verified_until: DateTime<Utc>,
}
