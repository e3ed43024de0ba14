//! Equipment API endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        equipment::{Availability, CreateEquipment, DisposeEquipment, StockAdjustment},
        EquipmentItem,
    },
    AppState,
};

use super::AuthenticatedUser;

/// List all equipment
#[utoipa::path(
    get,
    path = "/equipment",
    tag = "equipment",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Equipment list", body = Vec<EquipmentItem>)
    )
)]
pub async fn list_equipment(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<EquipmentItem>>> {
    Ok(Json(state.services.equipment.list().await))
}

/// Get equipment by ID
#[utoipa::path(
    get,
    path = "/equipment/{id}",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Equipment ID")),
    responses(
        (status = 200, description = "Equipment details", body = EquipmentItem),
        (status = 404, description = "Equipment not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_equipment(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<EquipmentItem>> {
    let equipment = state.services.equipment.get_by_id(id).await?;
    Ok(Json(equipment))
}

/// Units currently free to borrow
#[utoipa::path(
    get,
    path = "/equipment/{id}/availability",
    tag = "equipment",
    params(("id" = Uuid, Path, description = "Equipment ID")),
    responses(
        (status = 200, description = "Available quantity", body = Availability),
        (status = 404, description = "Equipment not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_availability(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Availability>> {
    let available = state.services.ledger.get_available(id).await?;
    Ok(Json(Availability {
        equipment_id: id,
        available,
    }))
}

/// Register equipment
#[utoipa::path(
    post,
    path = "/equipment",
    tag = "equipment",
    security(("bearer_auth" = [])),
    request_body = CreateEquipment,
    responses(
        (status = 201, description = "Equipment created", body = EquipmentItem),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_equipment(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateEquipment>,
) -> AppResult<(StatusCode, Json<EquipmentItem>)> {
    claims.require_admin()?;
    let equipment = state.services.equipment.create(&data, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(equipment)))
}

/// Send available units to maintenance
#[utoipa::path(
    post,
    path = "/equipment/{id}/maintenance",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Equipment ID")),
    request_body = StockAdjustment,
    responses(
        (status = 200, description = "Stock updated", body = EquipmentItem),
        (status = 409, description = "Not enough available units", body = crate::error::ErrorResponse)
    )
)]
pub async fn send_to_maintenance(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(data): Json<StockAdjustment>,
) -> AppResult<Json<EquipmentItem>> {
    claims.require_admin()?;
    let equipment = state.services.equipment.send_to_maintenance(id, &data, Utc::now()).await?;
    Ok(Json(equipment))
}

/// Return repaired units to circulation
#[utoipa::path(
    post,
    path = "/equipment/{id}/maintenance/restore",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Equipment ID")),
    request_body = StockAdjustment,
    responses(
        (status = 200, description = "Stock updated", body = EquipmentItem),
        (status = 409, description = "Not enough units in maintenance", body = crate::error::ErrorResponse)
    )
)]
pub async fn restore_from_maintenance(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(data): Json<StockAdjustment>,
) -> AppResult<Json<EquipmentItem>> {
    claims.require_admin()?;
    let equipment = state
        .services
        .equipment
        .restore_from_maintenance(id, &data, Utc::now())
        .await?;
    Ok(Json(equipment))
}

/// Write units off
#[utoipa::path(
    post,
    path = "/equipment/{id}/disposal",
    tag = "equipment",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Equipment ID")),
    request_body = DisposeEquipment,
    responses(
        (status = 200, description = "Stock updated", body = EquipmentItem),
        (status = 409, description = "Not enough units in the bucket", body = crate::error::ErrorResponse)
    )
)]
pub async fn dispose_equipment(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(data): Json<DisposeEquipment>,
) -> AppResult<Json<EquipmentItem>> {
    claims.require_admin()?;
    let equipment = state.services.equipment.dispose(id, &data, Utc::now()).await?;
    Ok(Json(equipment))
}
