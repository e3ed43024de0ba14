//! Guest borrowing model

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::enums::{DamageSeverity, ItemCondition};
use crate::error::{AppError, AppResult};

/// Lifecycle of a guest request. There is no return-request step: an admin
/// records the return directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GuestBorrowingStatus {
    Pending,
    Approved,
    Declined,
    Returned,
}

/// Admin action on a guest request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuestAction {
    Approve,
    Decline,
    RecordReturn,
}

const TRANSITIONS: &[(GuestBorrowingStatus, GuestAction, GuestBorrowingStatus)] = &[
    (GuestBorrowingStatus::Pending, GuestAction::Approve, GuestBorrowingStatus::Approved),
    (GuestBorrowingStatus::Approved, GuestAction::Approve, GuestBorrowingStatus::Approved),
    (GuestBorrowingStatus::Pending, GuestAction::Decline, GuestBorrowingStatus::Declined),
    (GuestBorrowingStatus::Approved, GuestAction::RecordReturn, GuestBorrowingStatus::Returned),
];

impl GuestBorrowingStatus {
    pub fn next(self, action: GuestAction) -> AppResult<GuestBorrowingStatus> {
        TRANSITIONS
            .iter()
            .find(|(from, a, _)| *from == self && *a == action)
            .map(|(_, _, to)| *to)
            .ok_or_else(|| {
                AppError::InvalidTransition(format!(
                    "cannot {} a guest request that is {}",
                    action.label(),
                    self.label()
                ))
            })
    }

    pub fn label(self) -> &'static str {
        match self {
            GuestBorrowingStatus::Pending => "pending",
            GuestBorrowingStatus::Approved => "approved",
            GuestBorrowingStatus::Declined => "declined",
            GuestBorrowingStatus::Returned => "returned",
        }
    }
}

impl GuestAction {
    pub fn label(self) -> &'static str {
        match self {
            GuestAction::Approve => "approve",
            GuestAction::Decline => "decline",
            GuestAction::RecordReturn => "record the return of",
        }
    }
}

/// Guest borrowing request record
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GuestBorrowingRequest {
    pub id: Uuid,
    /// Reference quoted to the guest, e.g. `GBR-20240301-4KQ7ZT`
    pub request_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub organization: Option<String>,
    pub equipment_id: Uuid,
    pub quantity: i32,
    pub purpose: String,
    pub intended_borrow_date: DateTime<Utc>,
    pub intended_return_date: DateTime<Utc>,
    pub status: GuestBorrowingStatus,
    pub admin_notes: Option<String>,
    pub approved_date: Option<DateTime<Utc>>,
    pub returned_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GuestBorrowingRequest {
    pub fn new(data: CreateGuestBorrowing, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_id: generate_request_id(now),
            email: normalize_email(&data.email),
            first_name: data.first_name.trim().to_string(),
            last_name: data.last_name.trim().to_string(),
            phone: data.phone,
            organization: data.organization,
            equipment_id: data.equipment_id,
            quantity: data.quantity.unwrap_or(1),
            purpose: data.purpose.trim().to_string(),
            intended_borrow_date: data.intended_borrow_date,
            intended_return_date: data.intended_return_date,
            status: GuestBorrowingStatus::Pending,
            admin_notes: None,
            approved_date: None,
            returned_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

fn generate_request_id(now: DateTime<Utc>) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..6)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("GBR-{}-{}", now.format("%Y%m%d"), suffix)
}

/// Emails are compared case-insensitively everywhere
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Guest submission
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateGuestBorrowing {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, max = 100, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Last name is required"))]
    pub last_name: String,
    pub phone: Option<String>,
    pub organization: Option<String>,
    pub equipment_id: Uuid,
    /// Defaults to one unit
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: Option<i32>,
    #[validate(length(min = 1, max = 500, message = "Purpose must be 1-500 characters"))]
    pub purpose: String,
    pub intended_borrow_date: DateTime<Utc>,
    pub intended_return_date: DateTime<Utc>,
}

/// Condition assessment an admin may attach when recording a guest return
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct GuestReturnAssessment {
    pub condition_on_return: ItemCondition,
    #[validate(length(max = 2000, message = "Damage description is too long"))]
    pub damage_description: Option<String>,
    #[serde(default)]
    pub damage_severity: DamageSeverity,
    /// Defaults to the time the return is recorded
    pub actual_return_date: Option<DateTime<Utc>>,
    /// Overrides the scheduled damage fee
    pub damage_fee: Option<Decimal>,
}

/// Guest request list filters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct GuestBorrowingQuery {
    pub status: Option<GuestBorrowingStatus>,
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use GuestAction as A;
    use GuestBorrowingStatus as S;

    #[test]
    fn guest_table_has_no_return_request_step() {
        assert_eq!(S::Pending.next(A::Approve).unwrap(), S::Approved);
        assert_eq!(S::Approved.next(A::RecordReturn).unwrap(), S::Returned);
        assert_eq!(S::Pending.next(A::Decline).unwrap(), S::Declined);
        assert!(S::Pending.next(A::RecordReturn).is_err());
        assert!(S::Declined.next(A::Approve).is_err());
        assert!(S::Returned.next(A::RecordReturn).is_err());
    }

    #[test]
    fn request_id_has_date_prefix() {
        let now = "2024-03-01T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let id = generate_request_id(now);
        assert!(id.starts_with("GBR-20240301-"));
        assert_eq!(id.len(), "GBR-20240301-".len() + 6);
    }
}
