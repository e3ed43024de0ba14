//! Regular borrowing workflow
//!
//! pending → approved → released → return_requested → return_approved →
//! returned, with rejection and return-cancel branches. Stock is reserved at
//! approval and credited back only when a return is finalized.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        borrowing::{BorrowingAction, BorrowingQuery, CreateBorrowing},
        return_record::{ReturnQuery, ReviewReturn, SubmitReturn},
        BorrowingRequest, BorrowingStatus, ReturnRecord, ReturnStatus,
    },
    repository::{Repository, Tables},
    services::{
        fees::{FeeEngine, ReturnAssessmentInput, ReturnRouting},
        ledger,
        workflow::BorrowingWorkflow,
    },
};

/// A borrowing together with the return record an action produced
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReturnOutcome {
    pub borrowing: BorrowingRequest,
    pub return_record: ReturnRecord,
}

#[derive(Clone)]
pub struct BorrowingsService {
    repository: Repository,
    fees: FeeEngine,
}

/// Look up a borrowing and the status `action` would move it to
fn plan(tables: &Tables, id: Uuid, action: BorrowingAction) -> AppResult<(BorrowingRequest, BorrowingStatus)> {
    let current = tables.borrowing_get(id)?.clone();
    let next = current.status.next(action)?;
    Ok((current, next))
}

fn validate_submission(data: &CreateBorrowing) -> AppResult<()> {
    if data.quantity < 1 {
        return Err(AppError::Validation("Quantity must be at least 1".to_string()));
    }
    let purpose = data.purpose.trim();
    if purpose.is_empty() || purpose.len() > 500 {
        return Err(AppError::Validation("Purpose must be 1-500 characters".to_string()));
    }
    if data.intended_return_date <= data.intended_borrow_date {
        return Err(AppError::Validation(
            "Intended return date must be after the intended borrow date".to_string(),
        ));
    }
    Ok(())
}

impl BorrowingsService {
    pub fn new(repository: Repository, fees: FeeEngine) -> Self {
        Self { repository, fees }
    }

    pub async fn get(&self, id: Uuid) -> AppResult<BorrowingRequest> {
        self.repository.borrowings_get_by_id(id).await
    }

    pub async fn list(&self, query: &BorrowingQuery) -> Vec<BorrowingRequest> {
        self.repository.borrowings_list(query).await
    }

    pub async fn list_overdue(&self, now: DateTime<Utc>) -> Vec<BorrowingRequest> {
        self.repository.borrowings_list_overdue(now).await
    }

    pub async fn get_return(&self, id: Uuid) -> AppResult<ReturnRecord> {
        self.repository.returns_get_by_id(id).await
    }

    pub async fn list_returns(&self, query: &ReturnQuery) -> Vec<ReturnRecord> {
        self.repository.returns_list(query).await
    }

    /// Create a pending request; checked against current availability but
    /// nothing is reserved until approval
    pub async fn create(&self, data: CreateBorrowing, now: DateTime<Utc>) -> AppResult<BorrowingRequest> {
        validate_submission(&data)?;

        let borrowing = self
            .repository
            .transaction(|tables| {
                let item = tables.equipment_get(data.equipment_id)?;
                if item.available < data.quantity {
                    return Err(AppError::InsufficientStock {
                        requested: data.quantity,
                        available: item.available,
                    });
                }
                let borrowing = BorrowingRequest::new(data, now);
                tables.borrowings.insert(borrowing.id, borrowing.clone());
                Ok(borrowing)
            })
            .await?;

        tracing::info!(
            borrowing_id = %borrowing.id,
            equipment_id = %borrowing.equipment_id,
            quantity = borrowing.quantity,
            "Borrowing request submitted"
        );
        Ok(borrowing)
    }

    /// Borrower hands equipment back. Undamaged or lightly damaged returns
    /// finalize immediately; moderate and severe damage waits for review.
    pub async fn request_return(
        &self,
        id: Uuid,
        borrower_id: Uuid,
        submission: SubmitReturn,
        now: DateTime<Utc>,
    ) -> AppResult<ReturnOutcome> {
        submission.validate()?;
        let actual_return_date = now;

        let outcome = self
            .repository
            .transaction(|tables| {
                let (current, requested) = plan(tables, id, BorrowingAction::RequestReturn)?;
                if current.borrower_id != borrower_id {
                    return Err(AppError::Unauthorized(
                        "Only the borrower can submit this return".to_string(),
                    ));
                }
                if current.released_date.is_some_and(|released| actual_return_date < released) {
                    return Err(AppError::Validation(
                        "Return date cannot precede the release date".to_string(),
                    ));
                }

                let assessment = self.fees.assess(&ReturnAssessmentInput {
                    intended_return_date: current.intended_return_date,
                    actual_return_date,
                    condition_on_return: submission.condition_on_return,
                    damage_description: submission.damage_description.clone(),
                    damage_severity: submission.damage_severity,
                });

                let (status, return_status) = match assessment.routing {
                    ReturnRouting::AutoComplete => {
                        let returned = requested
                            .next(BorrowingAction::ApproveReturn)?
                            .next(BorrowingAction::CompleteReturn)?;
                        let item = tables.equipment_get_mut(current.equipment_id)?;
                        ledger::release(item, current.quantity, now)?;
                        (returned, ReturnStatus::Completed)
                    }
                    ReturnRouting::ManualReview => (requested, ReturnStatus::Pending),
                };

                let record = ReturnRecord {
                    id: Uuid::new_v4(),
                    borrowing_id: id,
                    equipment_id: current.equipment_id,
                    condition_before: current.condition_on_borrow,
                    condition_after: submission.condition_on_return,
                    damage_description: submission.damage_description.clone(),
                    damage_severity: submission.damage_severity,
                    is_late: assessment.is_late,
                    late_days: assessment.late_days,
                    penalty_fee: assessment.penalty_fee,
                    damage_fee: assessment.damage_fee,
                    total_fee: assessment.total_fee,
                    is_fee_paid: false,
                    status: return_status,
                    actual_return_date,
                    reviewed_at: (return_status == ReturnStatus::Completed).then_some(now),
                    admin_remarks: None,
                    created_at: now,
                    updated_at: now,
                };
                tables.returns.insert(record.id, record.clone());

                let borrowing = tables.borrowing_get_mut(id)?;
                borrowing.status = status;
                borrowing.actual_return_date = Some(actual_return_date);
                borrowing.condition_on_return = Some(submission.condition_on_return);
                borrowing.damage_report = submission.damage_description.clone();
                borrowing.penalty_fee = Some(record.total_fee);
                borrowing.return_status = Some(return_status);
                borrowing.updated_at = now;

                Ok(ReturnOutcome {
                    borrowing: borrowing.clone(),
                    return_record: record,
                })
            })
            .await?;

        tracing::info!(
            borrowing_id = %id,
            return_id = %outcome.return_record.id,
            severity = %outcome.return_record.damage_severity,
            status = outcome.borrowing.status.label(),
            total_fee = %outcome.return_record.total_fee,
            "Return submitted"
        );
        Ok(outcome)
    }

    /// Withdraw a return that no admin has decided on yet. The pending
    /// record is deleted; the ledger was never touched so nothing is undone.
    pub async fn cancel_return(&self, id: Uuid, borrower_id: Uuid, now: DateTime<Utc>) -> AppResult<BorrowingRequest> {
        let borrowing = self
            .repository
            .transaction(|tables| {
                let (current, released) = plan(tables, id, BorrowingAction::CancelReturn)?;
                if current.borrower_id != borrower_id {
                    return Err(AppError::Unauthorized(
                        "Only the borrower can cancel this return".to_string(),
                    ));
                }

                if let Some(return_id) = tables.return_pending_for(id) {
                    tables.returns.remove(&return_id);
                }

                let borrowing = tables.borrowing_get_mut(id)?;
                borrowing.status = released;
                borrowing.actual_return_date = None;
                borrowing.condition_on_return = None;
                borrowing.damage_report = None;
                borrowing.penalty_fee = None;
                borrowing.return_status = None;
                borrowing.updated_at = now;
                Ok(borrowing.clone())
            })
            .await?;

        tracing::info!(borrowing_id = %id, "Return cancelled");
        Ok(borrowing)
    }

    /// Approve a return parked for review and credit the ledger
    pub async fn approve_return(
        &self,
        return_id: Uuid,
        review: ReviewReturn,
        now: DateTime<Utc>,
    ) -> AppResult<ReturnOutcome> {
        review.validate()?;
        if review.damage_fee.is_some_and(|fee| fee < Decimal::ZERO) {
            return Err(AppError::Validation("Damage fee cannot be negative".to_string()));
        }

        let outcome = self
            .repository
            .transaction(|tables| {
                let record = tables.return_get(return_id)?.clone();
                if record.status != ReturnStatus::Pending {
                    return Err(AppError::InvalidTransition(format!(
                        "return {} is already {:?}",
                        return_id, record.status
                    )));
                }
                let (current, approved) = plan(tables, record.borrowing_id, BorrowingAction::ApproveReturn)?;
                let returned = approved.next(BorrowingAction::CompleteReturn)?;

                let item = tables.equipment_get_mut(current.equipment_id)?;
                ledger::release(item, current.quantity, now)?;

                let record = tables.return_get_mut(return_id)?;
                if let Some(fee) = review.damage_fee {
                    record.damage_fee = fee;
                    record.total_fee = record.penalty_fee + fee;
                }
                record.status = ReturnStatus::Approved;
                record.reviewed_at = Some(now);
                record.admin_remarks = review.remarks.clone();
                record.updated_at = now;
                let record = record.clone();

                let borrowing = tables.borrowing_get_mut(current.id)?;
                borrowing.status = returned;
                borrowing.return_status = Some(ReturnStatus::Approved);
                borrowing.penalty_fee = Some(record.total_fee);
                borrowing.admin_remarks = review.remarks.clone();
                borrowing.updated_at = now;

                Ok(ReturnOutcome {
                    borrowing: borrowing.clone(),
                    return_record: record,
                })
            })
            .await?;

        tracing::info!(
            return_id = %return_id,
            borrowing_id = %outcome.borrowing.id,
            total_fee = %outcome.return_record.total_fee,
            "Return approved"
        );
        Ok(outcome)
    }

    /// Reject a return parked for review; the borrower may submit again
    pub async fn reject_return(
        &self,
        return_id: Uuid,
        remarks: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<ReturnOutcome> {
        let outcome = self
            .repository
            .transaction(|tables| {
                let record = tables.return_get(return_id)?.clone();
                if record.status != ReturnStatus::Pending {
                    return Err(AppError::InvalidTransition(format!(
                        "return {} is already {:?}",
                        return_id, record.status
                    )));
                }
                let (current, rejected) = plan(tables, record.borrowing_id, BorrowingAction::RejectReturn)?;

                let record = tables.return_get_mut(return_id)?;
                record.status = ReturnStatus::Rejected;
                record.reviewed_at = Some(now);
                record.admin_remarks = remarks.clone();
                record.updated_at = now;
                let record = record.clone();

                let borrowing = tables.borrowing_get_mut(current.id)?;
                borrowing.status = rejected;
                borrowing.return_status = Some(ReturnStatus::Rejected);
                borrowing.admin_remarks = remarks;
                borrowing.updated_at = now;

                Ok(ReturnOutcome {
                    borrowing: borrowing.clone(),
                    return_record: record,
                })
            })
            .await?;

        tracing::info!(return_id = %return_id, borrowing_id = %outcome.borrowing.id, "Return rejected");
        Ok(outcome)
    }

    /// Record payment of a finalized return's fee
    pub async fn mark_fee_paid(&self, return_id: Uuid, now: DateTime<Utc>) -> AppResult<ReturnRecord> {
        self.repository
            .transaction(|tables| {
                let record = tables.return_get_mut(return_id)?;
                if !record.status.is_final() {
                    return Err(AppError::InvalidTransition(format!(
                        "fees can only be settled on a finalized return, this one is {:?}",
                        record.status
                    )));
                }
                if !record.is_fee_paid {
                    record.is_fee_paid = true;
                    record.updated_at = now;
                }
                Ok(record.clone())
            })
            .await
    }

    async fn pending_return_id(&self, borrowing_id: Uuid) -> AppResult<Uuid> {
        self.repository
            .read(|tables| {
                let borrowing = tables.borrowing_get(borrowing_id)?;
                tables.return_pending_for(borrowing_id).ok_or_else(|| {
                    AppError::InvalidTransition(format!(
                        "borrowing request {} has no return awaiting review (it is {})",
                        borrowing_id,
                        borrowing.status.label()
                    ))
                })
            })
            .await
    }
}

#[async_trait]
impl BorrowingWorkflow for BorrowingsService {
    type Submission = CreateBorrowing;
    type Record = BorrowingRequest;
    type Status = BorrowingStatus;

    async fn submit(&self, submission: CreateBorrowing, now: DateTime<Utc>) -> AppResult<BorrowingRequest> {
        self.create(submission, now).await
    }

    async fn approve(&self, id: Uuid, remarks: Option<String>, now: DateTime<Utc>) -> AppResult<BorrowingRequest> {
        let (borrowing, changed) = self
            .repository
            .transaction(|tables| {
                let (current, approved) = plan(tables, id, BorrowingAction::Approve)?;
                if approved == current.status {
                    return Ok((current, false));
                }

                let item = tables.equipment_get_mut(current.equipment_id)?;
                ledger::reserve_and_commit(item, current.quantity, now)?;

                let borrowing = tables.borrowing_get_mut(id)?;
                borrowing.status = approved;
                borrowing.approved_date = Some(now);
                borrowing.admin_remarks = remarks;
                borrowing.updated_at = now;
                Ok((borrowing.clone(), true))
            })
            .await?;

        if changed {
            tracing::info!(borrowing_id = %id, quantity = borrowing.quantity, "Borrowing request approved");
        } else {
            tracing::debug!(borrowing_id = %id, "Borrowing request already approved");
        }
        Ok(borrowing)
    }

    async fn reject(&self, id: Uuid, remarks: Option<String>, now: DateTime<Utc>) -> AppResult<BorrowingRequest> {
        let borrowing = self
            .repository
            .transaction(|tables| {
                let (_, rejected) = plan(tables, id, BorrowingAction::Reject)?;
                let borrowing = tables.borrowing_get_mut(id)?;
                borrowing.status = rejected;
                borrowing.admin_remarks = remarks;
                borrowing.updated_at = now;
                Ok(borrowing.clone())
            })
            .await?;

        tracing::info!(borrowing_id = %id, "Borrowing request rejected");
        Ok(borrowing)
    }

    async fn release(&self, id: Uuid, remarks: Option<String>, now: DateTime<Utc>) -> AppResult<BorrowingRequest> {
        let borrowing = self
            .repository
            .transaction(|tables| {
                let (current, released) = plan(tables, id, BorrowingAction::Release)?;
                let condition = tables.equipment_get(current.equipment_id)?.condition;

                let borrowing = tables.borrowing_get_mut(id)?;
                borrowing.status = released;
                borrowing.released_date = Some(now);
                borrowing.condition_on_borrow = Some(condition);
                if remarks.is_some() {
                    borrowing.admin_remarks = remarks;
                }
                borrowing.updated_at = now;
                Ok(borrowing.clone())
            })
            .await?;

        tracing::info!(
            borrowing_id = %id,
            due = %borrowing.intended_return_date,
            "Equipment released to borrower"
        );
        Ok(borrowing)
    }

    async fn complete_return(&self, id: Uuid, remarks: Option<String>, now: DateTime<Utc>) -> AppResult<BorrowingRequest> {
        let return_id = self.pending_return_id(id).await?;
        let review = ReviewReturn { remarks, damage_fee: None };
        Ok(self.approve_return(return_id, review, now).await?.borrowing)
    }

    async fn update_status(
        &self,
        id: Uuid,
        target: BorrowingStatus,
        remarks: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<BorrowingRequest> {
        match target {
            BorrowingStatus::Approved => self.approve(id, remarks, now).await,
            BorrowingStatus::Rejected => self.reject(id, remarks, now).await,
            BorrowingStatus::Released => self.release(id, remarks, now).await,
            BorrowingStatus::ReturnApproved | BorrowingStatus::Returned => {
                self.complete_return(id, remarks, now).await
            }
            BorrowingStatus::ReturnRejected => {
                let return_id = self.pending_return_id(id).await?;
                Ok(self.reject_return(return_id, remarks, now).await?.borrowing)
            }
            BorrowingStatus::Pending | BorrowingStatus::ReturnRequested => Err(AppError::InvalidTransition(
                format!("{} can only be reached by a borrower submission", target.label()),
            )),
        }
    }
}
