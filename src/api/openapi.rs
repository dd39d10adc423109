//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{bookings, completions, events, health, operations, routes};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Schoolride API",
        version = "1.0.0",
        description = "Child transportation booking and daily operations REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Bookings
        bookings::create_booking,
        bookings::get_booking,
        bookings::get_booking_history,
        bookings::list_student_bookings,
        bookings::rebook,
        bookings::record_payment_result,
        bookings::approve_booking,
        bookings::reject_booking,
        bookings::cancel_booking,
        bookings::complete_booking,
        bookings::list_booking_records,
        // Routes
        routes::get_availability,
        routes::list_pickup_points,
        routes::get_roster,
        routes::mark_pickup_point_complete,
        routes::mark_booking_complete,
        // Completions
        completions::get_completion,
        completions::complete_route,
        // Operations
        operations::expire_due,
        operations::generate_rosters,
        operations::run_sweep,
        // Events
        events::stream_events,
    ),
    components(
        schemas(
            // Bookings
            crate::models::booking::Booking,
            crate::models::booking::PickupLocation,
            crate::models::booking::AddressPickup,
            crate::models::booking::CreateBookingRequest,
            crate::models::booking::RebookRequest,
            crate::models::booking::PaymentResultRequest,
            crate::models::enums::BookingStatus,
            crate::models::enums::PlanType,
            crate::models::enums::TripType,
            crate::models::enums::Period,
            crate::models::enums::ServiceType,
            // Routes
            crate::models::route::Route,
            crate::models::route::PickupPoint,
            crate::models::route::RouteAvailability,
            // Daily operations
            crate::models::daily::DailyPickupRecord,
            crate::models::daily::RouteCompletion,
            crate::models::daily::RosterEntry,
            crate::models::daily::Roster,
            crate::models::daily::RouteCompletionStatus,
            crate::models::daily::MarkPickupPointRequest,
            crate::models::daily::MarkBookingRequest,
            crate::models::daily::CompleteRouteRequest,
            operations::RosterGenerationResponse,
            crate::services::operations::SweepReport,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "bookings", description = "Booking lifecycle"),
        (name = "routes", description = "Availability, rosters and pickup marking"),
        (name = "completions", description = "Route completion"),
        (name = "operations", description = "Daily batch jobs"),
        (name = "events", description = "Domain event stream")
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
