//! Return record queries

use uuid::Uuid;

use super::{Repository, Tables};
use crate::{
    error::{AppError, AppResult},
    models::{return_record::ReturnQuery, ReturnRecord, ReturnStatus},
};

impl Tables {
    pub fn return_get(&self, id: Uuid) -> AppResult<&ReturnRecord> {
        self.returns
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Return record {} not found", id)))
    }

    pub fn return_get_mut(&mut self, id: Uuid) -> AppResult<&mut ReturnRecord> {
        self.returns
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Return record {} not found", id)))
    }

    /// The unresolved return attached to a borrowing, if any
    pub fn return_pending_for(&self, borrowing_id: Uuid) -> Option<Uuid> {
        self.returns
            .values()
            .find(|r| r.borrowing_id == borrowing_id && r.status == ReturnStatus::Pending)
            .map(|r| r.id)
    }
}

impl Repository {
    pub async fn returns_get_by_id(&self, id: Uuid) -> AppResult<ReturnRecord> {
        self.read(|tables| tables.return_get(id).cloned()).await
    }

    pub async fn returns_list(&self, query: &ReturnQuery) -> Vec<ReturnRecord> {
        self.read(|tables| {
            let mut rows: Vec<ReturnRecord> = tables
                .returns
                .values()
                .filter(|r| query.status.map_or(true, |s| r.status == s))
                .filter(|r| query.borrowing_id.map_or(true, |id| r.borrowing_id == id))
                .cloned()
                .collect();
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            rows
        })
        .await
    }
}
