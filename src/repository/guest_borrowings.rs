//! Guest borrowing queries

use uuid::Uuid;

use super::{Repository, Tables};
use crate::{
    error::{AppError, AppResult},
    models::{
        guest::{normalize_email, GuestBorrowingQuery},
        GuestBorrowingRequest, GuestBorrowingStatus,
    },
};

impl Tables {
    pub fn guest_borrowing_get(&self, id: Uuid) -> AppResult<&GuestBorrowingRequest> {
        self.guest_borrowings
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Guest request {} not found", id)))
    }

    pub fn guest_borrowing_get_mut(&mut self, id: Uuid) -> AppResult<&mut GuestBorrowingRequest> {
        self.guest_borrowings
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Guest request {} not found", id)))
    }

    /// Whether the email already has a pending request for this equipment
    pub fn guest_borrowing_has_pending(&self, email: &str, equipment_id: Uuid) -> bool {
        self.guest_borrowings.values().any(|g| {
            g.status == GuestBorrowingStatus::Pending
                && g.equipment_id == equipment_id
                && g.email == email
        })
    }
}

impl Repository {
    pub async fn guest_borrowings_get_by_id(&self, id: Uuid) -> AppResult<GuestBorrowingRequest> {
        self.read(|tables| tables.guest_borrowing_get(id).cloned()).await
    }

    pub async fn guest_borrowings_list(&self, query: &GuestBorrowingQuery) -> Vec<GuestBorrowingRequest> {
        let email = query.email.as_deref().map(normalize_email);
        self.read(|tables| {
            let mut rows: Vec<GuestBorrowingRequest> = tables
                .guest_borrowings
                .values()
                .filter(|g| query.status.map_or(true, |s| g.status == s))
                .filter(|g| email.as_ref().map_or(true, |e| &g.email == e))
                .cloned()
                .collect();
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            rows
        })
        .await
    }
}
