//! Guest endpoints: email verification, submission and admin decisions

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        guest::{CreateGuestBorrowing, GuestBorrowingQuery, GuestReturnAssessment},
        otp::{OtpIssued, OtpVerified, SendOtpRequest, VerifyOtpRequest},
        GuestBorrowingRequest, GuestBorrowingStatus,
    },
    services::workflow::BorrowingWorkflow,
    AppState,
};

use super::AuthenticatedUser;

/// Admin status change on a guest request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateGuestStatus {
    pub status: GuestBorrowingStatus,
    #[validate(length(max = 2000, message = "Remarks are too long"))]
    pub remarks: Option<String>,
    /// Condition assessment, only read when recording a return
    pub assessment: Option<GuestReturnAssessment>,
}

/// Email a verification code to a guest
#[utoipa::path(
    post,
    path = "/guest/otp",
    tag = "guests",
    request_body = SendOtpRequest,
    responses(
        (status = 201, description = "Code sent", body = OtpIssued),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 429, description = "A code was sent recently", body = crate::error::ErrorResponse)
    )
)]
pub async fn send_otp(
    State(state): State<AppState>,
    Json(data): Json<SendOtpRequest>,
) -> AppResult<(StatusCode, Json<OtpIssued>)> {
    data.validate()?;
    let issued = state
        .services
        .verification
        .send_otp(&data.email, &data.first_name, &data.last_name, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(issued)))
}

/// Check a verification code
#[utoipa::path(
    post,
    path = "/guest/otp/verify",
    tag = "guests",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Email verified", body = OtpVerified),
        (status = 401, description = "Invalid or expired code", body = crate::error::ErrorResponse)
    )
)]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(data): Json<VerifyOtpRequest>,
) -> AppResult<Json<OtpVerified>> {
    data.validate()?;
    let verified = state
        .services
        .verification
        .verify_otp(&data.email, &data.code, Utc::now())
        .await?;
    Ok(Json(verified))
}

/// Submit a guest request from a verified email
#[utoipa::path(
    post,
    path = "/guest/borrowings",
    tag = "guests",
    request_body = CreateGuestBorrowing,
    responses(
        (status = 201, description = "Request submitted", body = GuestBorrowingRequest),
        (status = 403, description = "Email not verified", body = crate::error::ErrorResponse),
        (status = 409, description = "Duplicate request or not enough units", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_guest_borrowing(
    State(state): State<AppState>,
    Json(data): Json<CreateGuestBorrowing>,
) -> AppResult<(StatusCode, Json<GuestBorrowingRequest>)> {
    let request = state.services.guests.submit(data, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

#[utoipa::path(
    get,
    path = "/guest/borrowings",
    tag = "guests",
    security(("bearer_auth" = [])),
    params(GuestBorrowingQuery),
    responses(
        (status = 200, description = "Guest requests", body = Vec<GuestBorrowingRequest>)
    )
)]
pub async fn list_guest_borrowings(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<GuestBorrowingQuery>,
) -> AppResult<Json<Vec<GuestBorrowingRequest>>> {
    claims.require_admin()?;
    Ok(Json(state.services.guests.list(&query).await))
}

#[utoipa::path(
    get,
    path = "/guest/borrowings/{id}",
    tag = "guests",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Guest request ID")),
    responses(
        (status = 200, description = "Guest request", body = GuestBorrowingRequest),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_guest_borrowing(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<GuestBorrowingRequest>> {
    claims.require_admin()?;
    Ok(Json(state.services.guests.get(id).await?))
}

/// Approve, decline or record the return of a guest request
#[utoipa::path(
    put,
    path = "/guest/borrowings/{id}/status",
    tag = "guests",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Guest request ID")),
    request_body = UpdateGuestStatus,
    responses(
        (status = 200, description = "Status updated", body = GuestBorrowingRequest),
        (status = 409, description = "Not enough units available", body = crate::error::ErrorResponse),
        (status = 422, description = "Transition not allowed", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_guest_status(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(data): Json<UpdateGuestStatus>,
) -> AppResult<Json<GuestBorrowingRequest>> {
    claims.require_admin()?;
    data.validate()?;
    let now = Utc::now();
    let request = match (data.status, data.assessment) {
        (GuestBorrowingStatus::Returned, Some(assessment)) => {
            state
                .services
                .guests
                .record_return(id, Some(assessment), data.remarks, now)
                .await?
                .borrowing
        }
        (status, _) => state.services.guests.update_status(id, status, data.remarks, now).await?,
    };
    Ok(Json(request))
}
