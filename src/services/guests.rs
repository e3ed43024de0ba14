//! Guest borrowing workflow
//!
//! Guests skip the release and return-request steps: an admin approves,
//! declines, or records the return directly. Each decision is emailed to the
//! guest after the transition has been committed.

use std::sync::Arc;

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
        guest::{normalize_email, CreateGuestBorrowing, GuestAction, GuestBorrowingQuery, GuestReturnAssessment},
        GuestBorrowingRequest, GuestBorrowingStatus, ReturnRecord, ReturnStatus,
    },
    repository::{Repository, Tables},
    services::{
        email::{NotificationEvent, NotificationPayload, Notifier},
        fees::{FeeEngine, ReturnAssessmentInput},
        ledger,
        otp::GuestVerificationService,
        workflow::BorrowingWorkflow,
    },
};

/// A recorded guest return and the assessment attached to it, if any
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GuestReturnOutcome {
    pub borrowing: GuestBorrowingRequest,
    pub return_record: Option<ReturnRecord>,
}

#[derive(Clone)]
pub struct GuestBorrowingsService {
    repository: Repository,
    verification: GuestVerificationService,
    notifier: Arc<dyn Notifier>,
    fees: FeeEngine,
}

fn plan(tables: &Tables, id: Uuid, action: GuestAction) -> AppResult<(GuestBorrowingRequest, GuestBorrowingStatus)> {
    let current = tables.guest_borrowing_get(id)?.clone();
    let next = current.status.next(action)?;
    Ok((current, next))
}

impl GuestBorrowingsService {
    pub fn new(
        repository: Repository,
        verification: GuestVerificationService,
        notifier: Arc<dyn Notifier>,
        fees: FeeEngine,
    ) -> Self {
        Self {
            repository,
            verification,
            notifier,
            fees,
        }
    }

    pub async fn get(&self, id: Uuid) -> AppResult<GuestBorrowingRequest> {
        self.repository.guest_borrowings_get_by_id(id).await
    }

    pub async fn list(&self, query: &GuestBorrowingQuery) -> Vec<GuestBorrowingRequest> {
        self.repository.guest_borrowings_list(query).await
    }

    /// Submit a request from a verified email. The verification is claimed
    /// up front and handed back if the request is refused.
    pub async fn create(&self, data: CreateGuestBorrowing, now: DateTime<Utc>) -> AppResult<GuestBorrowingRequest> {
        data.validate()?;
        if data.intended_return_date <= data.intended_borrow_date {
            return Err(AppError::Validation(
                "Intended return date must be after the intended borrow date".to_string(),
            ));
        }
        let email = normalize_email(&data.email);
        let verified_until = self.verification.claim_verification(&email, now).await?;

        let quantity = data.quantity.unwrap_or(1);
        let inserted = self
            .repository
            .transaction(|tables| {
                let item = tables.equipment_get(data.equipment_id)?;
                if tables.guest_borrowing_has_pending(&email, data.equipment_id) {
                    return Err(AppError::DuplicateRequest(format!(
                        "{} already has a pending request for {}",
                        email, item.name
                    )));
                }
                if item.available < quantity {
                    return Err(AppError::InsufficientStock {
                        requested: quantity,
                        available: item.available,
                    });
                }
                let request = GuestBorrowingRequest::new(data, now);
                tables.guest_borrowings.insert(request.id, request.clone());
                Ok(request)
            })
            .await;

        let request = match inserted {
            Ok(request) => request,
            Err(e) => {
                if let Err(restore) = self.verification.restore_verification(&email, verified_until, now).await {
                    tracing::warn!(%email, "Failed to restore guest verification: {}", restore);
                }
                return Err(e);
            }
        };

        if let Err(e) = self.verification.finish_verification(&email).await {
            tracing::warn!(%email, "Failed to clear guest code session: {}", e);
        }

        tracing::info!(
            request_id = %request.request_id,
            equipment_id = %request.equipment_id,
            quantity = request.quantity,
            "Guest borrowing request submitted"
        );
        Ok(request)
    }

    /// Admin records the return, optionally with a condition assessment
    pub async fn record_return(
        &self,
        id: Uuid,
        assessment: Option<GuestReturnAssessment>,
        remarks: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<GuestReturnOutcome> {
        if let Some(assessment) = &assessment {
            assessment.validate()?;
            if assessment.damage_fee.is_some_and(|fee| fee < Decimal::ZERO) {
                return Err(AppError::Validation("Damage fee cannot be negative".to_string()));
            }
        }

        let (outcome, equipment_name) = self
            .repository
            .transaction(|tables| {
                let (current, returned) = plan(tables, id, GuestAction::RecordReturn)?;
                let actual_return_date = assessment
                    .as_ref()
                    .and_then(|a| a.actual_return_date)
                    .unwrap_or(now);
                if actual_return_date > now {
                    return Err(AppError::Validation(
                        "Return date cannot be in the future".to_string(),
                    ));
                }
                if current.approved_date.is_some_and(|approved| actual_return_date < approved) {
                    return Err(AppError::Validation(
                        "Return date cannot precede the approval date".to_string(),
                    ));
                }

                let item = tables.equipment_get_mut(current.equipment_id)?;
                ledger::release(item, current.quantity, now)?;
                let equipment_name = item.name.clone();

                let return_record = assessment.map(|a| {
                    let fees = self.fees.assess(&ReturnAssessmentInput {
                        intended_return_date: current.intended_return_date,
                        actual_return_date,
                        condition_on_return: a.condition_on_return,
                        damage_description: a.damage_description.clone(),
                        damage_severity: a.damage_severity,
                    });
                    let damage_fee = a.damage_fee.unwrap_or(fees.damage_fee);
                    ReturnRecord {
                        id: Uuid::new_v4(),
                        borrowing_id: id,
                        equipment_id: current.equipment_id,
                        condition_before: None,
                        condition_after: a.condition_on_return,
                        damage_description: a.damage_description,
                        damage_severity: a.damage_severity,
                        is_late: fees.is_late,
                        late_days: fees.late_days,
                        penalty_fee: fees.penalty_fee,
                        damage_fee,
                        total_fee: fees.penalty_fee + damage_fee,
                        is_fee_paid: false,
                        status: ReturnStatus::Completed,
                        actual_return_date,
                        reviewed_at: Some(now),
                        admin_remarks: remarks.clone(),
                        created_at: now,
                        updated_at: now,
                    }
                });
                if let Some(record) = &return_record {
                    tables.returns.insert(record.id, record.clone());
                }

                let borrowing = tables.guest_borrowing_get_mut(id)?;
                borrowing.status = returned;
                borrowing.returned_date = Some(actual_return_date);
                if remarks.is_some() {
                    borrowing.admin_notes = remarks;
                }
                borrowing.updated_at = now;

                Ok((
                    GuestReturnOutcome {
                        borrowing: borrowing.clone(),
                        return_record,
                    },
                    equipment_name,
                ))
            })
            .await?;

        tracing::info!(
            request_id = %outcome.borrowing.request_id,
            assessed = outcome.return_record.is_some(),
            "Guest return recorded"
        );
        self.notify(NotificationEvent::Returned, &outcome.borrowing, equipment_name)
            .await;
        Ok(outcome)
    }

    async fn equipment_name(&self, equipment_id: Uuid) -> Option<String> {
        self.repository
            .equipment_get_by_id(equipment_id)
            .await
            .ok()
            .map(|item| item.name)
    }

    /// Tell the guest about a committed decision. Delivery problems are
    /// logged and otherwise ignored.
    async fn notify(&self, event: NotificationEvent, request: &GuestBorrowingRequest, equipment_name: String) {
        let payload = NotificationPayload {
            recipient_name: request.full_name(),
            request_id: Some(request.request_id.clone()),
            equipment_name: Some(equipment_name),
            code: None,
            remarks: request.admin_notes.clone(),
        };
        if let Err(e) = self.notifier.notify(event, &request.email, payload).await {
            tracing::warn!(
                request_id = %request.request_id,
                ?event,
                "Failed to notify guest: {}",
                e
            );
        }
    }
}

#[async_trait]
impl BorrowingWorkflow for GuestBorrowingsService {
    type Submission = CreateGuestBorrowing;
    type Record = GuestBorrowingRequest;
    type Status = GuestBorrowingStatus;

    async fn submit(&self, submission: CreateGuestBorrowing, now: DateTime<Utc>) -> AppResult<GuestBorrowingRequest> {
        self.create(submission, now).await
    }

    async fn approve(&self, id: Uuid, remarks: Option<String>, now: DateTime<Utc>) -> AppResult<GuestBorrowingRequest> {
        let (request, equipment_name) = self
            .repository
            .transaction(|tables| {
                let (current, approved) = plan(tables, id, GuestAction::Approve)?;
                if approved == current.status {
                    return Ok((current, None));
                }

                let item = tables.equipment_get_mut(current.equipment_id)?;
                ledger::reserve_and_commit(item, current.quantity, now)?;
                let equipment_name = item.name.clone();

                let request = tables.guest_borrowing_get_mut(id)?;
                request.status = approved;
                request.approved_date = Some(now);
                request.admin_notes = remarks;
                request.updated_at = now;
                Ok((request.clone(), Some(equipment_name)))
            })
            .await?;

        match equipment_name {
            Some(name) => {
                tracing::info!(request_id = %request.request_id, quantity = request.quantity, "Guest request approved");
                self.notify(NotificationEvent::Approved, &request, name).await;
            }
            None => tracing::debug!(request_id = %request.request_id, "Guest request already approved"),
        }
        Ok(request)
    }

    async fn reject(&self, id: Uuid, remarks: Option<String>, now: DateTime<Utc>) -> AppResult<GuestBorrowingRequest> {
        let request = self
            .repository
            .transaction(|tables| {
                let (_, declined) = plan(tables, id, GuestAction::Decline)?;
                let request = tables.guest_borrowing_get_mut(id)?;
                request.status = declined;
                request.admin_notes = remarks;
                request.updated_at = now;
                Ok(request.clone())
            })
            .await?;

        tracing::info!(request_id = %request.request_id, "Guest request declined");
        let name = self.equipment_name(request.equipment_id).await.unwrap_or_default();
        self.notify(NotificationEvent::Rejected, &request, name).await;
        Ok(request)
    }

    async fn release(&self, id: Uuid, _remarks: Option<String>, _now: DateTime<Utc>) -> AppResult<GuestBorrowingRequest> {
        Err(AppError::InvalidTransition(format!(
            "guest request {} has no release step",
            id
        )))
    }

    async fn complete_return(
        &self,
        id: Uuid,
        remarks: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<GuestBorrowingRequest> {
        Ok(self.record_return(id, None, remarks, now).await?.borrowing)
    }

    async fn update_status(
        &self,
        id: Uuid,
        target: GuestBorrowingStatus,
        remarks: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<GuestBorrowingRequest> {
        match target {
            GuestBorrowingStatus::Approved => self.approve(id, remarks, now).await,
            GuestBorrowingStatus::Declined => self.reject(id, remarks, now).await,
            GuestBorrowingStatus::Returned => self.complete_return(id, remarks, now).await,
            GuestBorrowingStatus::Pending => Err(AppError::InvalidTransition(
                "a guest request cannot be moved back to pending".to_string(),
            )),
        }
    }
}
