//! Return review endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        return_record::{ReturnDecision, ReturnQuery, ReviewReturn},
        ReturnRecord,
    },
    services::borrowings::ReturnOutcome,
    AppState,
};

use super::AuthenticatedUser;

/// Admin decision on a return awaiting review
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReviewReturnRequest {
    pub status: ReturnDecision,
    #[validate(length(max = 2000, message = "Remarks are too long"))]
    pub remarks: Option<String>,
    /// Damage fee entered by the reviewer; ignored on rejection
    pub damage_fee: Option<Decimal>,
}

/// List return records. Borrowers may filter by one of their borrowings.
#[utoipa::path(
    get,
    path = "/returns",
    tag = "returns",
    security(("bearer_auth" = [])),
    params(ReturnQuery),
    responses(
        (status = 200, description = "Return records", body = Vec<ReturnRecord>)
    )
)]
pub async fn list_returns(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<ReturnQuery>,
) -> AppResult<Json<Vec<ReturnRecord>>> {
    if !claims.is_admin() {
        let borrowing_id = query.borrowing_id.ok_or_else(|| {
            crate::error::AppError::Unauthorized("Borrowers must filter by borrowing_id".to_string())
        })?;
        let borrowing = state.services.borrowings.get(borrowing_id).await?;
        claims.require_self_or_admin(borrowing.borrower_id)?;
    }
    Ok(Json(state.services.borrowings.list_returns(&query).await))
}

#[utoipa::path(
    get,
    path = "/returns/{id}",
    tag = "returns",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Return record ID")),
    responses(
        (status = 200, description = "Return record", body = ReturnRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_return(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ReturnRecord>> {
    let record = state.services.borrowings.get_return(id).await?;
    if !claims.is_admin() {
        let borrowing = state.services.borrowings.get(record.borrowing_id).await?;
        claims.require_self_or_admin(borrowing.borrower_id)?;
    }
    Ok(Json(record))
}

/// Approve or reject a return awaiting review
#[utoipa::path(
    put,
    path = "/returns/{id}/status",
    tag = "returns",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Return record ID")),
    request_body = ReviewReturnRequest,
    responses(
        (status = 200, description = "Return reviewed", body = ReturnOutcome),
        (status = 422, description = "Return already decided", body = crate::error::ErrorResponse)
    )
)]
pub async fn review_return(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(data): Json<ReviewReturnRequest>,
) -> AppResult<Json<ReturnOutcome>> {
    claims.require_admin()?;
    data.validate()?;
    let now = Utc::now();
    let outcome = match data.status {
        ReturnDecision::Approved => {
            let review = ReviewReturn {
                remarks: data.remarks,
                damage_fee: data.damage_fee,
            };
            state.services.borrowings.approve_return(id, review, now).await?
        }
        ReturnDecision::Rejected => state.services.borrowings.reject_return(id, data.remarks, now).await?,
    };
    Ok(Json(outcome))
}

/// Record payment of a finalized return's fees
#[utoipa::path(
    post,
    path = "/returns/{id}/payment",
    tag = "returns",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Return record ID")),
    responses(
        (status = 200, description = "Fee marked as paid", body = ReturnRecord),
        (status = 422, description = "Return not finalized", body = crate::error::ErrorResponse)
    )
)]
pub async fn mark_fee_paid(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ReturnRecord>> {
    claims.require_admin()?;
    let record = state.services.borrowings.mark_fee_paid(id, Utc::now()).await?;
    Ok(Json(record))
}
