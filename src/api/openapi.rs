//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{borrowings, equipment, guests, health, returns};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Equiplend API",
        version = "1.0.0",
        description = "Equipment borrowing and return REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Equipment
        equipment::list_equipment,
        equipment::get_equipment,
        equipment::get_availability,
        equipment::create_equipment,
        equipment::send_to_maintenance,
        equipment::restore_from_maintenance,
        equipment::dispose_equipment,
        // Borrowings
        borrowings::create_borrowing,
        borrowings::list_borrowings,
        borrowings::list_overdue,
        borrowings::get_borrowing,
        borrowings::update_status,
        borrowings::request_return,
        borrowings::cancel_return,
        // Returns
        returns::list_returns,
        returns::get_return,
        returns::review_return,
        returns::mark_fee_paid,
        // Guests
        guests::send_otp,
        guests::verify_otp,
        guests::create_guest_borrowing,
        guests::list_guest_borrowings,
        guests::get_guest_borrowing,
        guests::update_guest_status,
    ),
    components(
        schemas(
            // Equipment
            crate::models::EquipmentItem,
            crate::models::equipment::CreateEquipment,
            crate::models::equipment::StockAdjustment,
            crate::models::equipment::DisposeEquipment,
            crate::models::equipment::Availability,
            crate::models::enums::ItemCondition,
            crate::models::enums::DamageSeverity,
            crate::models::enums::BorrowerType,
            crate::models::enums::EquipmentStatus,
            crate::models::enums::StockBucket,
            // Borrowings
            crate::models::BorrowingRequest,
            crate::models::BorrowingStatus,
            crate::models::borrowing::BorrowingDetails,
            borrowings::CreateBorrowingRequest,
            borrowings::UpdateBorrowingStatus,
            // Returns
            crate::models::ReturnRecord,
            crate::models::ReturnStatus,
            crate::models::return_record::SubmitReturn,
            crate::models::return_record::ReturnDecision,
            crate::services::borrowings::ReturnOutcome,
            returns::ReviewReturnRequest,
            // Guests
            crate::models::GuestBorrowingRequest,
            crate::models::GuestBorrowingStatus,
            crate::models::guest::CreateGuestBorrowing,
            crate::models::guest::GuestReturnAssessment,
            crate::models::otp::SendOtpRequest,
            crate::models::otp::VerifyOtpRequest,
            crate::models::otp::OtpIssued,
            crate::models::otp::OtpVerified,
            guests::UpdateGuestStatus,
            // Health
            health::HealthResponse,
            health::ReadinessResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "equipment", description = "Equipment and stock management"),
        (name = "borrowings", description = "Registered borrower requests"),
        (name = "returns", description = "Return review and fees"),
        (name = "guests", description = "Guest verification and requests")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
