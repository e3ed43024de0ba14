//! Borrowing endpoints for registered borrowers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        borrowing::{BorrowingDetails, BorrowingQuery, CreateBorrowing},
        return_record::SubmitReturn,
        BorrowerType, BorrowingStatus,
    },
    services::{borrowings::ReturnOutcome, workflow::BorrowingWorkflow},
    AppState,
};

use super::AuthenticatedUser;

/// Create borrowing request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBorrowingRequest {
    pub equipment_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    #[validate(length(min = 1, max = 500, message = "Purpose must be 1-500 characters"))]
    pub purpose: String,
    pub intended_borrow_date: DateTime<Utc>,
    pub intended_return_date: DateTime<Utc>,
    /// Defaults to student
    #[serde(default)]
    pub borrower_type: BorrowerType,
}

/// Admin status change
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBorrowingStatus {
    /// Target status
    pub status: BorrowingStatus,
    #[validate(length(max = 2000, message = "Remarks are too long"))]
    pub remarks: Option<String>,
}

/// Submit a borrowing request for the authenticated borrower
#[utoipa::path(
    post,
    path = "/borrowings",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    request_body = CreateBorrowingRequest,
    responses(
        (status = 201, description = "Request submitted", body = BorrowingDetails),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 404, description = "Equipment not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Not enough units available", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_borrowing(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateBorrowingRequest>,
) -> AppResult<(StatusCode, Json<BorrowingDetails>)> {
    data.validate()?;
    let now = Utc::now();
    let borrowing = state
        .services
        .borrowings
        .submit(
            CreateBorrowing {
                borrower_id: claims.user_id,
                borrower_type: data.borrower_type,
                equipment_id: data.equipment_id,
                quantity: data.quantity,
                purpose: data.purpose,
                intended_borrow_date: data.intended_borrow_date,
                intended_return_date: data.intended_return_date,
            },
            now,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(BorrowingDetails::at(borrowing, now))))
}

/// List borrowing requests. Borrowers only see their own.
#[utoipa::path(
    get,
    path = "/borrowings",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(BorrowingQuery),
    responses(
        (status = 200, description = "Borrowing requests", body = Vec<BorrowingDetails>)
    )
)]
pub async fn list_borrowings(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(mut query): Query<BorrowingQuery>,
) -> AppResult<Json<Vec<BorrowingDetails>>> {
    if !claims.is_admin() {
        query.borrower_id = Some(claims.user_id);
    }
    let now = Utc::now();
    let rows = state.services.borrowings.list(&query).await;
    Ok(Json(rows.into_iter().map(|b| BorrowingDetails::at(b, now)).collect()))
}

/// Outstanding borrowings past their intended return date
#[utoipa::path(
    get,
    path = "/borrowings/overdue",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Overdue borrowings", body = Vec<BorrowingDetails>),
        (status = 403, description = "Admin only", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_overdue(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<BorrowingDetails>>> {
    claims.require_admin()?;
    let now = Utc::now();
    let rows = state.services.borrowings.list_overdue(now).await;
    Ok(Json(rows.into_iter().map(|b| BorrowingDetails::at(b, now)).collect()))
}

#[utoipa::path(
    get,
    path = "/borrowings/{id}",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Borrowing request ID")),
    responses(
        (status = 200, description = "Borrowing request", body = BorrowingDetails),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_borrowing(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<BorrowingDetails>> {
    let borrowing = state.services.borrowings.get(id).await?;
    claims.require_self_or_admin(borrowing.borrower_id)?;
    Ok(Json(BorrowingDetails::at(borrowing, Utc::now())))
}

/// Drive a request to a new status (approve, reject, release, finalize or
/// reject a pending return)
#[utoipa::path(
    put,
    path = "/borrowings/{id}/status",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Borrowing request ID")),
    request_body = UpdateBorrowingStatus,
    responses(
        (status = 200, description = "Status updated", body = BorrowingDetails),
        (status = 409, description = "Not enough units available", body = crate::error::ErrorResponse),
        (status = 422, description = "Transition not allowed", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_status(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(data): Json<UpdateBorrowingStatus>,
) -> AppResult<Json<BorrowingDetails>> {
    claims.require_admin()?;
    data.validate()?;
    let now = Utc::now();
    let borrowing = state
        .services
        .borrowings
        .update_status(id, data.status, data.remarks, now)
        .await?;
    Ok(Json(BorrowingDetails::at(borrowing, now)))
}

/// Hand equipment back
#[utoipa::path(
    post,
    path = "/borrowings/{id}/return",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Borrowing request ID")),
    request_body = SubmitReturn,
    responses(
        (status = 201, description = "Return recorded", body = ReturnOutcome),
        (status = 403, description = "Not the borrower", body = crate::error::ErrorResponse),
        (status = 422, description = "Nothing to return", body = crate::error::ErrorResponse)
    )
)]
pub async fn request_return(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(data): Json<SubmitReturn>,
) -> AppResult<(StatusCode, Json<ReturnOutcome>)> {
    let outcome = state
        .services
        .borrowings
        .request_return(id, claims.user_id, data, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Withdraw a return that is still awaiting review
#[utoipa::path(
    delete,
    path = "/borrowings/{id}/return",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Borrowing request ID")),
    responses(
        (status = 200, description = "Return cancelled", body = BorrowingDetails),
        (status = 403, description = "Not the borrower", body = crate::error::ErrorResponse),
        (status = 422, description = "No pending return", body = crate::error::ErrorResponse)
    )
)]
pub async fn cancel_return(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<BorrowingDetails>> {
    let now = Utc::now();
    let borrowing = state.services.borrowings.cancel_return(id, claims.user_id, now).await?;
    Ok(Json(BorrowingDetails::at(borrowing, now)))
}
