//! API handlers for Equiplend REST endpoints

pub mod borrowings;
pub mod equipment;
pub mod guests;
pub mod health;
pub mod openapi;
pub mod returns;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, models::user::UserClaims, AppState};

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Get the Authorization header
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let claims = UserClaims::from_token(token, &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Equipment and stock
        .route("/equipment", get(equipment::list_equipment).post(equipment::create_equipment))
        .route("/equipment/:id", get(equipment::get_equipment))
        .route("/equipment/:id/availability", get(equipment::get_availability))
        .route("/equipment/:id/maintenance", post(equipment::send_to_maintenance))
        .route("/equipment/:id/maintenance/restore", post(equipment::restore_from_maintenance))
        .route("/equipment/:id/disposal", post(equipment::dispose_equipment))
        // Registered borrowers
        .route("/borrowings", get(borrowings::list_borrowings).post(borrowings::create_borrowing))
        .route("/borrowings/overdue", get(borrowings::list_overdue))
        .route("/borrowings/:id", get(borrowings::get_borrowing))
        .route("/borrowings/:id/status", put(borrowings::update_status))
        .route(
            "/borrowings/:id/return",
            post(borrowings::request_return).delete(borrowings::cancel_return),
        )
        // Returns
        .route("/returns", get(returns::list_returns))
        .route("/returns/:id", get(returns::get_return))
        .route("/returns/:id/status", put(returns::review_return))
        .route("/returns/:id/payment", post(returns::mark_fee_paid))
        // Guests
        .route("/guest/otp", post(guests::send_otp))
        .route("/guest/otp/verify", post(guests::verify_otp))
        .route("/guest/borrowings", get(guests::list_guest_borrowings).post(guests::create_guest_borrowing))
        .route("/guest/borrowings/:id", get(guests::get_guest_borrowing))
        .route("/guest/borrowings/:id/status", put(guests::update_guest_status))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
