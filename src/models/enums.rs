//! Shared domain enums

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ---------------------------------------------------------------------------
// ItemCondition
// ---------------------------------------------------------------------------

/// Physical condition of an equipment unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ItemCondition {
    Excellent,
    #[default]
    Good,
    Fair,
    Poor,
    Damaged,
}

impl std::fmt::Display for ItemCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ItemCondition::Excellent => "Excellent",
            ItemCondition::Good => "Good",
            ItemCondition::Fair => "Fair",
            ItemCondition::Poor => "Poor",
            ItemCondition::Damaged => "Damaged",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// DamageSeverity
// ---------------------------------------------------------------------------

/// Damage classification recorded at return time.
///
/// None and Minor returns finalize automatically; Moderate and Severe
/// returns wait for an admin decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DamageSeverity {
    #[default]
    None,
    Minor,
    Moderate,
    Severe,
}

impl DamageSeverity {
    pub fn requires_review(self) -> bool {
        matches!(self, DamageSeverity::Moderate | DamageSeverity::Severe)
    }
}

impl std::fmt::Display for DamageSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DamageSeverity::None => "None",
            DamageSeverity::Minor => "Minor",
            DamageSeverity::Moderate => "Moderate",
            DamageSeverity::Severe => "Severe",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// BorrowerType
// ---------------------------------------------------------------------------

/// Category of a registered borrower
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BorrowerType {
    #[default]
    Student,
    Faculty,
    Staff,
}

// ---------------------------------------------------------------------------
// EquipmentStatus
// ---------------------------------------------------------------------------

/// Availability summary derived from the quantity buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentStatus {
    #[default]
    Available,
    FullyBorrowed,
    Maintenance,
    Retired,
}

// ---------------------------------------------------------------------------
// StockBucket
// ---------------------------------------------------------------------------

/// Quantity bucket units can be disposed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StockBucket {
    Available,
    Maintenance,
}

// ---------------------------------------------------------------------------
// UserRole
// ---------------------------------------------------------------------------

/// Role carried in the bearer token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Borrower,
}
