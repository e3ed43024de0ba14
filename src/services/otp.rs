//! Guest identity verification by one-time email code

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tokio::sync::Mutex;

use crate::{
    config::OtpConfig,
    error::{AppError, AppResult},
    models::{
        guest::normalize_email,
        otp::{OtpIssued, OtpSession, OtpVerified},
    },
    services::email::{NotificationEvent, NotificationPayload, Notifier},
};

/// Storage for pending codes and verified emails, keyed by normalized email
#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Store a session, replacing any previous one for the email
    async fn put_session(&self, session: OtpSession) -> AppResult<()>;
    async fn get_session(&self, email: &str) -> AppResult<Option<OtpSession>>;
    async fn remove_session(&self, email: &str) -> AppResult<()>;
    async fn put_verification(&self, email: &str, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> AppResult<()>;
    /// Expiry of the email's verification, if one exists
    async fn get_verification(&self, email: &str) -> AppResult<Option<DateTime<Utc>>>;
    /// Remove the email's verification and return its expiry in one step
    async fn take_verification(&self, email: &str) -> AppResult<Option<DateTime<Utc>>>;
}

/// Process-local store used when Redis is disabled
#[derive(Default)]
pub struct InMemoryOtpStore {
    sessions: Mutex<HashMap<String, OtpSession>>,
    verifications: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl InMemoryOtpStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OtpStore for InMemoryOtpStore {
    async fn put_session(&self, session: OtpSession) -> AppResult<()> {
        self.sessions.lock().await.insert(session.email.clone(), session);
        Ok(())
    }

    async fn get_session(&self, email: &str) -> AppResult<Option<OtpSession>> {
        Ok(self.sessions.lock().await.get(email).cloned())
    }

    async fn remove_session(&self, email: &str) -> AppResult<()> {
        self.sessions.lock().await.remove(email);
        Ok(())
    }

    async fn put_verification(&self, email: &str, expires_at: DateTime<Utc>, _now: DateTime<Utc>) -> AppResult<()> {
        self.verifications.lock().await.insert(email.to_string(), expires_at);
        Ok(())
    }

    async fn get_verification(&self, email: &str) -> AppResult<Option<DateTime<Utc>>> {
        Ok(self.verifications.lock().await.get(email).copied())
    }

    async fn take_verification(&self, email: &str) -> AppResult<Option<DateTime<Utc>>> {
        Ok(self.verifications.lock().await.remove(email))
    }
}

/// Issues and checks guest codes
#[derive(Clone)]
pub struct GuestVerificationService {
    store: Arc<dyn OtpStore>,
    notifier: Arc<dyn Notifier>,
    config: OtpConfig,
}

impl GuestVerificationService {
    pub fn new(store: Arc<dyn OtpStore>, notifier: Arc<dyn Notifier>, config: OtpConfig) -> Self {
        Self { store, notifier, config }
    }

    fn generate_code() -> String {
        let mut rng = rand::thread_rng();
        format!("{:06}", rng.gen_range(0..1_000_000))
    }

    /// Issue a fresh code for `email` and send it.
    ///
    /// A still-live unconsumed code younger than the resend cooldown blocks
    /// reissue; otherwise the new code replaces the old one.
    pub async fn send_otp(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
        now: DateTime<Utc>,
    ) -> AppResult<OtpIssued> {
        let email = normalize_email(email);

        if let Some(existing) = self.store.get_session(&email).await? {
            let cooldown_ends = existing.issued_at + Duration::seconds(self.config.resend_cooldown_seconds);
            if !existing.consumed && !existing.is_expired(now) && now < cooldown_ends {
                let wait = (cooldown_ends - now).num_seconds().max(1);
                return Err(AppError::RateLimited(format!(
                    "A code was already sent to {}; retry in {} seconds",
                    email, wait
                )));
            }
        }

        let code = Self::generate_code();
        let session = OtpSession::issue(
            &email,
            &code,
            first_name,
            last_name,
            now,
            Duration::seconds(self.config.ttl_seconds),
        );
        let expires_at = session.expires_at;
        self.store.put_session(session).await?;

        let payload = NotificationPayload {
            recipient_name: format!("{} {}", first_name.trim(), last_name.trim()),
            code: Some(code),
            ..Default::default()
        };
        if let Err(e) = self.notifier.notify(NotificationEvent::Otp, &email, payload).await {
            tracing::warn!(%email, "Failed to dispatch verification code: {}", e);
        }

        tracing::info!(%email, %expires_at, "Verification code issued");
        Ok(OtpIssued { email, expires_at })
    }

    /// Check a submitted code against the stored session
    pub async fn verify_otp(&self, email: &str, code: &str, now: DateTime<Utc>) -> AppResult<OtpVerified> {
        let email = normalize_email(email);

        let mut session = self
            .store
            .get_session(&email)
            .await?
            .ok_or_else(|| AppError::InvalidOtp("No code was requested for this email".to_string()))?;

        if session.consumed {
            return Err(AppError::InvalidOtp("Code has already been used".to_string()));
        }
        if session.is_expired(now) {
            self.store.remove_session(&email).await?;
            return Err(AppError::InvalidOtp("Code has expired; request a new one".to_string()));
        }
        if !session.matches(code) {
            session.failed_attempts += 1;
            tracing::warn!(%email, attempts = session.failed_attempts, "Rejected verification code");
            if session.failed_attempts >= self.config.max_attempts {
                self.store.remove_session(&email).await?;
                return Err(AppError::InvalidOtp(
                    "Too many failed attempts; request a new code".to_string(),
                ));
            }
            self.store.put_session(session).await?;
            return Err(AppError::InvalidOtp("Code does not match".to_string()));
        }

        session.consumed = true;
        self.store.put_session(session).await?;

        let verified_until = now + Duration::seconds(self.config.verification_ttl_seconds);
        self.store.put_verification(&email, verified_until, now).await?;

        tracing::info!(%email, "Guest email verified");
        Ok(OtpVerified { email, verified_until })
    }

    /// Claim the email's live verification for one submission.
    ///
    /// The claim removes the verification from the store, so two concurrent
    /// submissions can never both hold it. Returns the claimed expiry, which
    /// [`Self::restore_verification`] needs if the submission is refused.
    pub async fn claim_verification(&self, email: &str, now: DateTime<Utc>) -> AppResult<DateTime<Utc>> {
        let email = normalize_email(email);
        match self.store.take_verification(&email).await? {
            Some(until) if now < until => Ok(until),
            _ => Err(AppError::Unauthorized(
                "Email verification required before submitting a request".to_string(),
            )),
        }
    }

    /// Hand a claimed verification back after the submission was refused
    pub async fn restore_verification(&self, email: &str, until: DateTime<Utc>, now: DateTime<Utc>) -> AppResult<()> {
        let email = normalize_email(email);
        if now >= until {
            return Ok(());
        }
        self.store.put_verification(&email, until, now).await
    }

    /// Drop the spent code session once a submission has been stored
    pub async fn finish_verification(&self, email: &str) -> AppResult<()> {
        self.store.remove_session(&normalize_email(email)).await
    }
}
