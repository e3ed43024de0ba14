//! Equipment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::enums::{EquipmentStatus, ItemCondition, StockBucket};

/// Equipment record with its quantity buckets.
///
/// `available + borrowed + maintenance + disposal == total` holds after
/// every ledger operation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EquipmentItem {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub condition: ItemCondition,
    pub total: i32,
    pub available: i32,
    pub borrowed: i32,
    pub maintenance: i32,
    pub disposal: i32,
    pub status: EquipmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EquipmentItem {
    /// Register a new item with every unit available
    pub fn new(data: &CreateEquipment, now: DateTime<Utc>) -> Self {
        let mut item = Self {
            id: Uuid::new_v4(),
            name: data.name.trim().to_string(),
            category: data.category.trim().to_string(),
            condition: data.condition.unwrap_or_default(),
            total: data.total,
            available: data.total,
            borrowed: 0,
            maintenance: 0,
            disposal: 0,
            status: EquipmentStatus::Available,
            created_at: now,
            updated_at: now,
        };
        item.refresh_status();
        item
    }

    /// Whether the quantity buckets are consistent
    pub fn is_balanced(&self) -> bool {
        self.available >= 0
            && self.borrowed >= 0
            && self.maintenance >= 0
            && self.disposal >= 0
            && self.available + self.borrowed + self.maintenance + self.disposal == self.total
    }

    /// Recompute the status from the buckets
    pub fn refresh_status(&mut self) {
        self.status = if self.total > 0 && self.disposal == self.total {
            EquipmentStatus::Retired
        } else if self.available > 0 {
            EquipmentStatus::Available
        } else if self.borrowed > 0 {
            EquipmentStatus::FullyBorrowed
        } else {
            EquipmentStatus::Maintenance
        };
    }
}

/// Create equipment request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateEquipment {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 100, message = "Category must be 1-100 characters"))]
    pub category: String,
    pub condition: Option<ItemCondition>,
    #[validate(range(min = 1, message = "Total must be at least 1"))]
    pub total: i32,
}

/// Move units between buckets
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StockAdjustment {
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

/// Dispose units from a bucket
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DisposeEquipment {
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    pub from: StockBucket,
}

/// Availability snapshot
#[derive(Debug, Serialize, ToSchema)]
pub struct Availability {
    pub equipment_id: Uuid,
    pub available: i32,
}
