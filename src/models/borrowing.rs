//! Borrowing request model for registered borrowers

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::enums::{BorrowerType, ItemCondition};
use super::return_record::ReturnStatus;
use crate::error::{AppError, AppResult};

/// Lifecycle of a registered borrower's request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BorrowingStatus {
    Pending,
    Approved,
    Rejected,
    Released,
    ReturnRequested,
    ReturnApproved,
    ReturnRejected,
    Returned,
}

/// Action applied to a borrowing request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorrowingAction {
    Approve,
    Reject,
    Release,
    RequestReturn,
    CancelReturn,
    ApproveReturn,
    RejectReturn,
    CompleteReturn,
}

/// Every legal `(from, action) -> to` step. Anything absent is rejected.
const TRANSITIONS: &[(BorrowingStatus, BorrowingAction, BorrowingStatus)] = &[
    (BorrowingStatus::Pending, BorrowingAction::Approve, BorrowingStatus::Approved),
    (BorrowingStatus::Approved, BorrowingAction::Approve, BorrowingStatus::Approved),
    (BorrowingStatus::Pending, BorrowingAction::Reject, BorrowingStatus::Rejected),
    (BorrowingStatus::Approved, BorrowingAction::Release, BorrowingStatus::Released),
    (BorrowingStatus::Released, BorrowingAction::RequestReturn, BorrowingStatus::ReturnRequested),
    (BorrowingStatus::ReturnRejected, BorrowingAction::RequestReturn, BorrowingStatus::ReturnRequested),
    (BorrowingStatus::ReturnRequested, BorrowingAction::CancelReturn, BorrowingStatus::Released),
    (BorrowingStatus::ReturnRequested, BorrowingAction::ApproveReturn, BorrowingStatus::ReturnApproved),
    (BorrowingStatus::ReturnRequested, BorrowingAction::RejectReturn, BorrowingStatus::ReturnRejected),
    (BorrowingStatus::ReturnApproved, BorrowingAction::CompleteReturn, BorrowingStatus::Returned),
];

impl BorrowingStatus {
    /// Look up the state reached by applying `action`
    pub fn next(self, action: BorrowingAction) -> AppResult<BorrowingStatus> {
        TRANSITIONS
            .iter()
            .find(|(from, a, _)| *from == self && *a == action)
            .map(|(_, _, to)| *to)
            .ok_or_else(|| {
                AppError::InvalidTransition(format!(
                    "cannot {} a borrowing request that is {}",
                    action.label(),
                    self.label()
                ))
            })
    }

    /// Statuses in which the equipment is out with the borrower
    pub fn is_outstanding(self) -> bool {
        matches!(
            self,
            BorrowingStatus::Released
                | BorrowingStatus::ReturnRequested
                | BorrowingStatus::ReturnRejected
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            BorrowingStatus::Pending => "pending",
            BorrowingStatus::Approved => "approved",
            BorrowingStatus::Rejected => "rejected",
            BorrowingStatus::Released => "released",
            BorrowingStatus::ReturnRequested => "return_requested",
            BorrowingStatus::ReturnApproved => "return_approved",
            BorrowingStatus::ReturnRejected => "return_rejected",
            BorrowingStatus::Returned => "returned",
        }
    }
}

impl BorrowingAction {
    pub fn label(self) -> &'static str {
        match self {
            BorrowingAction::Approve => "approve",
            BorrowingAction::Reject => "reject",
            BorrowingAction::Release => "release",
            BorrowingAction::RequestReturn => "request a return for",
            BorrowingAction::CancelReturn => "cancel the return of",
            BorrowingAction::ApproveReturn => "approve the return of",
            BorrowingAction::RejectReturn => "reject the return of",
            BorrowingAction::CompleteReturn => "complete the return of",
        }
    }
}

/// Borrowing request record
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BorrowingRequest {
    pub id: Uuid,
    pub equipment_id: Uuid,
    pub borrower_id: Uuid,
    pub borrower_type: BorrowerType,
    pub quantity: i32,
    pub purpose: String,
    pub status: BorrowingStatus,
    pub requested_date: DateTime<Utc>,
    pub intended_borrow_date: DateTime<Utc>,
    pub intended_return_date: DateTime<Utc>,
    pub approved_date: Option<DateTime<Utc>>,
    pub released_date: Option<DateTime<Utc>>,
    pub actual_return_date: Option<DateTime<Utc>>,
    pub condition_on_borrow: Option<ItemCondition>,
    pub condition_on_return: Option<ItemCondition>,
    pub damage_report: Option<String>,
    /// Total fee assessed on the latest return
    pub penalty_fee: Option<Decimal>,
    pub return_status: Option<ReturnStatus>,
    pub admin_remarks: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl BorrowingRequest {
    pub fn new(data: CreateBorrowing, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            equipment_id: data.equipment_id,
            borrower_id: data.borrower_id,
            borrower_type: data.borrower_type,
            quantity: data.quantity,
            purpose: data.purpose.trim().to_string(),
            status: BorrowingStatus::Pending,
            requested_date: now,
            intended_borrow_date: data.intended_borrow_date,
            intended_return_date: data.intended_return_date,
            approved_date: None,
            released_date: None,
            actual_return_date: None,
            condition_on_borrow: None,
            condition_on_return: None,
            damage_report: None,
            penalty_fee: None,
            return_status: None,
            admin_remarks: None,
            updated_at: now,
        }
    }

    /// Overdue is advisory and never blocks the return path
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status.is_outstanding() && now > self.intended_return_date
    }
}

/// Borrowing request with the derived overdue flag, for display
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BorrowingDetails {
    #[serde(flatten)]
    pub borrowing: BorrowingRequest,
    pub is_overdue: bool,
}

impl BorrowingDetails {
    pub fn at(borrowing: BorrowingRequest, now: DateTime<Utc>) -> Self {
        let is_overdue = borrowing.is_overdue(now);
        Self { borrowing, is_overdue }
    }
}

/// Create borrowing (service input, borrower taken from the token)
#[derive(Debug, Clone)]
pub struct CreateBorrowing {
    pub borrower_id: Uuid,
    pub borrower_type: BorrowerType,
    pub equipment_id: Uuid,
    pub quantity: i32,
    pub purpose: String,
    pub intended_borrow_date: DateTime<Utc>,
    pub intended_return_date: DateTime<Utc>,
}

/// Borrowing list filters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BorrowingQuery {
    pub status: Option<BorrowingStatus>,
    pub borrower_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use BorrowingAction as A;
    use BorrowingStatus as S;

    #[test]
    fn approval_path_follows_table() {
        assert_eq!(S::Pending.next(A::Approve).unwrap(), S::Approved);
        assert_eq!(S::Approved.next(A::Release).unwrap(), S::Released);
        assert_eq!(S::Released.next(A::RequestReturn).unwrap(), S::ReturnRequested);
        assert_eq!(S::ReturnRequested.next(A::ApproveReturn).unwrap(), S::ReturnApproved);
        assert_eq!(S::ReturnApproved.next(A::CompleteReturn).unwrap(), S::Returned);
    }

    #[test]
    fn reapproval_stays_approved() {
        assert_eq!(S::Approved.next(A::Approve).unwrap(), S::Approved);
    }

    #[test]
    fn rejected_return_can_be_resubmitted() {
        assert_eq!(S::ReturnRequested.next(A::RejectReturn).unwrap(), S::ReturnRejected);
        assert_eq!(S::ReturnRejected.next(A::RequestReturn).unwrap(), S::ReturnRequested);
    }

    #[test]
    fn cancel_return_goes_back_to_released() {
        assert_eq!(S::ReturnRequested.next(A::CancelReturn).unwrap(), S::Released);
    }

    #[test]
    fn illegal_steps_are_rejected() {
        assert!(matches!(S::Pending.next(A::Release), Err(AppError::InvalidTransition(_))));
        assert!(matches!(S::Approved.next(A::Reject), Err(AppError::InvalidTransition(_))));
        assert!(matches!(S::Rejected.next(A::Approve), Err(AppError::InvalidTransition(_))));
        assert!(matches!(S::Released.next(A::CancelReturn), Err(AppError::InvalidTransition(_))));
        assert!(matches!(S::Returned.next(A::RequestReturn), Err(AppError::InvalidTransition(_))));
    }

    #[test]
    fn overdue_only_while_outstanding() {
        let now = Utc::now();
        let mut borrowing = BorrowingRequest::new(
            CreateBorrowing {
                borrower_id: Uuid::new_v4(),
                borrower_type: BorrowerType::Student,
                equipment_id: Uuid::new_v4(),
                quantity: 1,
                purpose: "lab".into(),
                intended_borrow_date: now - chrono::Duration::days(5),
                intended_return_date: now - chrono::Duration::days(1),
            },
            now - chrono::Duration::days(6),
        );
        assert!(!borrowing.is_overdue(now));
        borrowing.status = S::Released;
        assert!(borrowing.is_overdue(now));
        borrowing.status = S::ReturnRejected;
        assert!(borrowing.is_overdue(now));
        borrowing.status = S::Returned;
        assert!(!borrowing.is_overdue(now));
    }
}
