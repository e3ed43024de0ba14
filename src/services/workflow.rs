//! Capability shared by the regular and guest borrowing flows

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppResult;

/// One borrower shape's lifecycle. Both implementations reserve stock at
/// approval time and credit it back when the return is finalized.
#[async_trait]
pub trait BorrowingWorkflow: Send + Sync {
    type Submission: Send + 'static;
    type Record: Send + 'static;
    type Status: Copy + Send + Sync + 'static;

    /// Create a pending request. No stock is committed yet.
    async fn submit(&self, submission: Self::Submission, now: DateTime<Utc>) -> AppResult<Self::Record>;

    /// Reserve stock and approve. Approving an approved record is a no-op.
    async fn approve(&self, id: Uuid, remarks: Option<String>, now: DateTime<Utc>) -> AppResult<Self::Record>;

    async fn reject(&self, id: Uuid, remarks: Option<String>, now: DateTime<Utc>) -> AppResult<Self::Record>;

    /// Record the physical handoff
    async fn release(&self, id: Uuid, remarks: Option<String>, now: DateTime<Utc>) -> AppResult<Self::Record>;

    /// Finalize a return and credit the ledger
    async fn complete_return(&self, id: Uuid, remarks: Option<String>, now: DateTime<Utc>) -> AppResult<Self::Record>;

    /// Admin action contract: drive a record toward `target`
    async fn update_status(
        &self,
        id: Uuid,
        target: Self::Status,
        remarks: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<Self::Record>;
}
