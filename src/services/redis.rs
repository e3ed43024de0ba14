//! Redis-backed OTP store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::{AsyncCommands, Client};

use crate::{
    error::{AppError, AppResult},
    models::otp::OtpSession,
    services::otp::OtpStore,
};

/// Keys outlive the stored expiry so an expired code still reports as
/// expired rather than missing
const KEY_GRACE_SECONDS: i64 = 3600;

#[derive(Clone)]
pub struct RedisService {
    client: Client,
}

impl RedisService {
    /// Create a new Redis service
    pub async fn new(url: &str) -> AppResult<Self> {
        let client = Client::open(url)
            .map_err(|e| AppError::Internal(format!("Failed to create Redis client: {}", e)))?;

        // Test connection
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to connect to Redis: {}", e)))?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| AppError::Internal(format!("Redis connection test failed: {}", e)))?;

        Ok(Self { client })
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to get Redis connection: {}", e)))
    }

    fn session_key(email: &str) -> String {
        format!("otp:guest:{}", email)
    }

    fn verification_key(email: &str) -> String {
        format!("otp:verified:{}", email)
    }

    fn ttl_until(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
        let remaining = (expires_at - now).num_seconds().max(0);
        (remaining + KEY_GRACE_SECONDS) as u64
    }

    fn parse_verification(raw: &str) -> AppResult<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| AppError::Internal(format!("Corrupt verification timestamp: {}", e)))
    }
}

#[async_trait]
impl OtpStore for RedisService {
    async fn put_session(&self, session: OtpSession) -> AppResult<()> {
        let mut conn = self.connection().await?;
        let value = serde_json::to_string(&session)
            .map_err(|e| AppError::Internal(format!("Failed to encode OTP session: {}", e)))?;
        conn.set_ex::<_, _, ()>(Self::session_key(&session.email), value, Self::ttl_until(session.expires_at, session.issued_at))
            .await
            .map_err(|e| AppError::Internal(format!("Failed to store OTP session in Redis: {}", e)))
    }

    async fn get_session(&self, email: &str) -> AppResult<Option<OtpSession>> {
        let mut conn = self.connection().await?;
        let stored: Option<String> = conn
            .get(Self::session_key(email))
            .await
            .map_err(|e| AppError::Internal(format!("Failed to get OTP session from Redis: {}", e)))?;

        stored
            .map(|raw| {
                serde_json::from_str(&raw)
                    .map_err(|e| AppError::Internal(format!("Corrupt OTP session: {}", e)))
            })
            .transpose()
    }

    async fn remove_session(&self, email: &str) -> AppResult<()> {
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(Self::session_key(email))
            .await
            .map_err(|e| AppError::Internal(format!("Failed to delete OTP session from Redis: {}", e)))
    }

    async fn put_verification(&self, email: &str, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> AppResult<()> {
        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(Self::verification_key(email), expires_at.to_rfc3339(), Self::ttl_until(expires_at, now))
            .await
            .map_err(|e| AppError::Internal(format!("Failed to store verification in Redis: {}", e)))
    }

    async fn get_verification(&self, email: &str) -> AppResult<Option<DateTime<Utc>>> {
        let mut conn = self.connection().await?;
        let stored: Option<String> = conn
            .get(Self::verification_key(email))
            .await
            .map_err(|e| AppError::Internal(format!("Failed to get verification from Redis: {}", e)))?;

        stored.as_deref().map(Self::parse_verification).transpose()
    }

    async fn take_verification(&self, email: &str) -> AppResult<Option<DateTime<Utc>>> {
        let mut conn = self.connection().await?;
        let stored: Option<String> = redis::cmd("GETDEL")
            .arg(Self::verification_key(email))
            .query_async(&mut conn)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to take verification from Redis: {}", e)))?;

        stored.as_deref().map(Self::parse_verification).transpose()
    }
}
