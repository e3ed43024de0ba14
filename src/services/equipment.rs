//! Equipment service

use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        equipment::{Availability, CreateEquipment, DisposeEquipment, StockAdjustment},
        EquipmentItem,
    },
    repository::Repository,
    services::ledger,
};

#[derive(Clone)]
pub struct EquipmentService {
    repository: Repository,
}

impl EquipmentService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self) -> Vec<EquipmentItem> {
        self.repository.equipment_list().await
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<EquipmentItem> {
        self.repository.equipment_get_by_id(id).await
    }

    pub async fn availability(&self, id: Uuid) -> AppResult<Availability> {
        let item = self.repository.equipment_get_by_id(id).await?;
        Ok(Availability {
            equipment_id: item.id,
            available: item.available,
        })
    }

    pub async fn create(&self, data: &CreateEquipment, now: DateTime<Utc>) -> AppResult<EquipmentItem> {
        data.validate()?;
        let item = self.repository.equipment_insert(EquipmentItem::new(data, now)).await?;
        tracing::info!(equipment_id = %item.id, name = %item.name, total = item.total, "Equipment registered");
        Ok(item)
    }

    /// Take available units out of circulation for repair
    pub async fn send_to_maintenance(
        &self,
        id: Uuid,
        data: &StockAdjustment,
        now: DateTime<Utc>,
    ) -> AppResult<EquipmentItem> {
        data.validate()?;
        let item = self
            .repository
            .transaction(|tables| {
                let item = tables.equipment_get_mut(id)?;
                ledger::send_to_maintenance(item, data.quantity, now)?;
                Ok(item.clone())
            })
            .await?;
        tracing::info!(equipment_id = %id, quantity = data.quantity, "Units sent to maintenance");
        Ok(item)
    }

    pub async fn restore_from_maintenance(
        &self,
        id: Uuid,
        data: &StockAdjustment,
        now: DateTime<Utc>,
    ) -> AppResult<EquipmentItem> {
        data.validate()?;
        let item = self
            .repository
            .transaction(|tables| {
                let item = tables.equipment_get_mut(id)?;
                ledger::restore_from_maintenance(item, data.quantity, now)?;
                Ok(item.clone())
            })
            .await?;
        tracing::info!(equipment_id = %id, quantity = data.quantity, "Units restored from maintenance");
        Ok(item)
    }

    /// Permanently write units off. Borrowed units cannot be disposed.
    pub async fn dispose(&self, id: Uuid, data: &DisposeEquipment, now: DateTime<Utc>) -> AppResult<EquipmentItem> {
        data.validate()?;
        let item = self
            .repository
            .transaction(|tables| {
                let item = tables.equipment_get_mut(id)?;
                ledger::dispose(item, data.quantity, data.from, now)?;
                Ok(item.clone())
            })
            .await?;
        tracing::info!(equipment_id = %id, quantity = data.quantity, from = ?data.from, "Units disposed");
        Ok(item)
    }
}
