//! Borrowing request queries

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{Repository, Tables};
use crate::{
    error::{AppError, AppResult},
    models::{borrowing::BorrowingQuery, BorrowingRequest},
};

impl Tables {
    pub fn borrowing_get(&self, id: Uuid) -> AppResult<&BorrowingRequest> {
        self.borrowings
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Borrowing request {} not found", id)))
    }

    pub fn borrowing_get_mut(&mut self, id: Uuid) -> AppResult<&mut BorrowingRequest> {
        self.borrowings
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Borrowing request {} not found", id)))
    }
}

impl Repository {
    pub async fn borrowings_get_by_id(&self, id: Uuid) -> AppResult<BorrowingRequest> {
        self.read(|tables| tables.borrowing_get(id).cloned()).await
    }

    /// Filter by status and/or borrower, newest first
    pub async fn borrowings_list(&self, query: &BorrowingQuery) -> Vec<BorrowingRequest> {
        self.read(|tables| {
            let mut rows: Vec<BorrowingRequest> = tables
                .borrowings
                .values()
                .filter(|b| query.status.map_or(true, |s| b.status == s))
                .filter(|b| query.borrower_id.map_or(true, |id| b.borrower_id == id))
                .cloned()
                .collect();
            rows.sort_by(|a, b| b.requested_date.cmp(&a.requested_date));
            rows
        })
        .await
    }

    /// Outstanding borrowings past their intended return date
    pub async fn borrowings_list_overdue(&self, now: DateTime<Utc>) -> Vec<BorrowingRequest> {
        self.read(|tables| {
            let mut rows: Vec<BorrowingRequest> = tables
                .borrowings
                .values()
                .filter(|b| b.is_overdue(now))
                .cloned()
                .collect();
            rows.sort_by(|a, b| a.intended_return_date.cmp(&b.intended_return_date));
            rows
        })
        .await
    }
}
