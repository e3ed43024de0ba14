//! Equipment domain methods on Repository

use uuid::Uuid;

use super::{Repository, Tables};
use crate::{
    error::{AppError, AppResult},
    models::EquipmentItem,
};

impl Tables {
    pub fn equipment_get(&self, id: Uuid) -> AppResult<&EquipmentItem> {
        self.equipment
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    pub fn equipment_get_mut(&mut self, id: Uuid) -> AppResult<&mut EquipmentItem> {
        self.equipment
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }
}

impl Repository {
    /// List all equipment ordered by name
    pub async fn equipment_list(&self) -> Vec<EquipmentItem> {
        self.read(|tables| {
            let mut rows: Vec<EquipmentItem> = tables.equipment.values().cloned().collect();
            rows.sort_by(|a, b| a.name.cmp(&b.name));
            rows
        })
        .await
    }

    /// Get equipment by ID
    pub async fn equipment_get_by_id(&self, id: Uuid) -> AppResult<EquipmentItem> {
        self.read(|tables| tables.equipment_get(id).cloned()).await
    }

    /// Insert a new equipment item
    pub async fn equipment_insert(&self, item: EquipmentItem) -> AppResult<EquipmentItem> {
        self.transaction(|tables| {
            tables.equipment.insert(item.id, item.clone());
            Ok(item)
        })
        .await
    }
}
