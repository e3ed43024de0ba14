//! Inventory ledger
//!
//! The free functions are the only code that touches an item's quantity
//! buckets. Each one checks first and mutates second, so a failure leaves
//! the item untouched. `LedgerService` runs them inside a repository
//! transaction, which serializes concurrent callers.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{enums::StockBucket, EquipmentItem},
    repository::Repository,
};

fn ensure_positive(qty: i32) -> AppResult<()> {
    if qty <= 0 {
        return Err(AppError::Validation(format!("Quantity must be positive, got {}", qty)));
    }
    Ok(())
}

fn touch(item: &mut EquipmentItem, now: DateTime<Utc>) {
    item.refresh_status();
    item.updated_at = now;
    debug_assert!(item.is_balanced(), "ledger invariant broken for {}", item.id);
}

/// Move `qty` units from available to borrowed, or fail without changes
pub fn reserve_and_commit(item: &mut EquipmentItem, qty: i32, now: DateTime<Utc>) -> AppResult<()> {
    ensure_positive(qty)?;
    if item.available < qty {
        return Err(AppError::InsufficientStock {
            requested: qty,
            available: item.available,
        });
    }
    item.available -= qty;
    item.borrowed += qty;
    touch(item, now);
    Ok(())
}

/// Move up to `qty` units from borrowed back to available.
///
/// Clamped to what is actually borrowed; returns the number of units moved.
pub fn release(item: &mut EquipmentItem, qty: i32, now: DateTime<Utc>) -> AppResult<i32> {
    ensure_positive(qty)?;
    let moved = qty.min(item.borrowed).max(0);
    if moved < qty {
        tracing::warn!(
            equipment_id = %item.id,
            requested = qty,
            borrowed = item.borrowed,
            "Release clamped to borrowed quantity"
        );
    }
    item.borrowed -= moved;
    item.available += moved;
    touch(item, now);
    Ok(moved)
}

pub fn send_to_maintenance(item: &mut EquipmentItem, qty: i32, now: DateTime<Utc>) -> AppResult<()> {
    ensure_positive(qty)?;
    if item.available < qty {
        return Err(AppError::InsufficientStock {
            requested: qty,
            available: item.available,
        });
    }
    item.available -= qty;
    item.maintenance += qty;
    touch(item, now);
    Ok(())
}

pub fn restore_from_maintenance(item: &mut EquipmentItem, qty: i32, now: DateTime<Utc>) -> AppResult<()> {
    ensure_positive(qty)?;
    if item.maintenance < qty {
        return Err(AppError::InsufficientStock {
            requested: qty,
            available: item.maintenance,
        });
    }
    item.maintenance -= qty;
    item.available += qty;
    touch(item, now);
    Ok(())
}

pub fn dispose(item: &mut EquipmentItem, qty: i32, from: StockBucket, now: DateTime<Utc>) -> AppResult<()> {
    ensure_positive(qty)?;
    let bucket = match from {
        StockBucket::Available => &mut item.available,
        StockBucket::Maintenance => &mut item.maintenance,
    };
    if *bucket < qty {
        return Err(AppError::InsufficientStock {
            requested: qty,
            available: *bucket,
        });
    }
    *bucket -= qty;
    item.disposal += qty;
    touch(item, now);
    Ok(())
}

/// Atomic ledger operations addressed by equipment ID
#[derive(Clone)]
pub struct LedgerService {
    repository: Repository,
}

impl LedgerService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn get_available(&self, equipment_id: Uuid) -> AppResult<i32> {
        Ok(self.repository.equipment_get_by_id(equipment_id).await?.available)
    }

    pub async fn reserve_and_commit(
        &self,
        equipment_id: Uuid,
        qty: i32,
        now: DateTime<Utc>,
    ) -> AppResult<EquipmentItem> {
        self.repository
            .transaction(|tables| {
                let item = tables.equipment_get_mut(equipment_id)?;
                reserve_and_commit(item, qty, now)?;
                Ok(item.clone())
            })
            .await
    }

    pub async fn release(&self, equipment_id: Uuid, qty: i32, now: DateTime<Utc>) -> AppResult<EquipmentItem> {
        self.repository
            .transaction(|tables| {
                let item = tables.equipment_get_mut(equipment_id)?;
                release(item, qty, now)?;
                Ok(item.clone())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::equipment::CreateEquipment;

    fn item(total: i32) -> EquipmentItem {
        EquipmentItem::new(
            &CreateEquipment {
                name: "Projector".into(),
                category: "AV".into(),
                condition: None,
                total,
            },
            Utc::now(),
        )
    }

    #[test]
    fn reserve_moves_available_to_borrowed() {
        let mut projector = item(5);
        reserve_and_commit(&mut projector, 3, Utc::now()).unwrap();
        assert_eq!((projector.available, projector.borrowed), (2, 3));
        assert!(projector.is_balanced());
    }

    #[test]
    fn reserve_beyond_available_changes_nothing() {
        let mut projector = item(2);
        let err = reserve_and_commit(&mut projector, 3, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::InsufficientStock { requested: 3, available: 2 }));
        assert_eq!((projector.available, projector.borrowed), (2, 0));
    }

    #[test]
    fn reserve_then_release_restores_available() {
        let mut projector = item(4);
        reserve_and_commit(&mut projector, 4, Utc::now()).unwrap();
        assert_eq!(projector.status, crate::models::EquipmentStatus::FullyBorrowed);
        assert_eq!(release(&mut projector, 4, Utc::now()).unwrap(), 4);
        assert_eq!(projector.available, 4);
        assert_eq!(projector.status, crate::models::EquipmentStatus::Available);
    }

    #[test]
    fn release_is_clamped_to_borrowed() {
        let mut projector = item(3);
        reserve_and_commit(&mut projector, 1, Utc::now()).unwrap();
        assert_eq!(release(&mut projector, 5, Utc::now()).unwrap(), 1);
        assert_eq!((projector.available, projector.borrowed), (3, 0));
        assert!(projector.is_balanced());
    }

    #[test]
    fn non_positive_quantities_are_rejected() {
        let mut projector = item(3);
        assert!(matches!(reserve_and_commit(&mut projector, 0, Utc::now()), Err(AppError::Validation(_))));
        assert!(matches!(release(&mut projector, -1, Utc::now()), Err(AppError::Validation(_))));
    }

    #[test]
    fn maintenance_and_disposal_keep_the_sum() {
        let mut projector = item(6);
        send_to_maintenance(&mut projector, 2, Utc::now()).unwrap();
        dispose(&mut projector, 1, StockBucket::Maintenance, Utc::now()).unwrap();
        dispose(&mut projector, 1, StockBucket::Available, Utc::now()).unwrap();
        restore_from_maintenance(&mut projector, 1, Utc::now()).unwrap();
        assert_eq!(
            (projector.available, projector.maintenance, projector.disposal),
            (4, 0, 2)
        );
        assert!(projector.is_balanced());
        assert!(restore_from_maintenance(&mut projector, 1, Utc::now()).is_err());
    }

    #[test]
    fn disposing_everything_retires_the_item() {
        let mut projector = item(2);
        dispose(&mut projector, 2, StockBucket::Available, Utc::now()).unwrap();
        assert_eq!(projector.status, crate::models::EquipmentStatus::Retired);
    }
}
