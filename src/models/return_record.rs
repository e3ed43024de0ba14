//! Return record model and review requests

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::enums::{DamageSeverity, ItemCondition};

/// Review status of a return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReturnStatus {
    /// Waiting for an admin decision
    Pending,
    /// Approved by an admin after review
    Approved,
    Rejected,
    /// Finalized without review
    Completed,
}

impl ReturnStatus {
    pub fn is_final(self) -> bool {
        matches!(self, ReturnStatus::Approved | ReturnStatus::Completed)
    }
}

/// Return record created when a borrower hands equipment back
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReturnRecord {
    pub id: Uuid,
    /// Borrowing request (regular or guest) this return closes
    pub borrowing_id: Uuid,
    pub equipment_id: Uuid,
    pub condition_before: Option<ItemCondition>,
    pub condition_after: ItemCondition,
    pub damage_description: Option<String>,
    pub damage_severity: DamageSeverity,
    pub is_late: bool,
    pub late_days: i64,
    pub penalty_fee: Decimal,
    pub damage_fee: Decimal,
    pub total_fee: Decimal,
    pub is_fee_paid: bool,
    pub status: ReturnStatus,
    pub actual_return_date: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub admin_remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Borrower's return submission. The return is dated when it is received.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SubmitReturn {
    pub condition_on_return: ItemCondition,
    #[validate(length(max = 2000, message = "Damage description is too long"))]
    pub damage_description: Option<String>,
    #[serde(default)]
    pub damage_severity: DamageSeverity,
}

/// Admin decision on a pending return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReturnDecision {
    Approved,
    Rejected,
}

/// Admin review of a pending return
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct ReviewReturn {
    #[validate(length(max = 2000, message = "Remarks are too long"))]
    pub remarks: Option<String>,
    /// Overrides the assessed damage fee (manual entry for moderate/severe damage)
    pub damage_fee: Option<Decimal>,
}

/// Return list filters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ReturnQuery {
    pub status: Option<ReturnStatus>,
    pub borrowing_id: Option<Uuid>,
}
