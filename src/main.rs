//! Schoolride Server - child transportation bookings and daily operations
//!
//! REST API server for route bookings, rosters and pickup tracking.

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use schoolride_server::{
    api,
    clock::{SharedClock, SystemClock},
    config::AppConfig,
    repository::Repository,
    services::Services,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("schoolride_server={},tower_http=debug", config.logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Schoolride Server v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!("Database migrations completed");

    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    let clock: SharedClock = Arc::new(SystemClock::new(config.operations.utc_offset_minutes));
    let repository = Repository::new(pool);
    let services = Services::new(repository, &config, clock);

    if config.operations.sweep_interval_minutes > 0 {
        services.operations.clone().spawn();
        tracing::info!(
            every_minutes = config.operations.sweep_interval_minutes,
            "Daily sweep scheduled"
        );
    }

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    let app = create_router(state);

    let addr = SocketAddr::new(
        server_host.parse().context("Invalid host address")?,
        server_port,
    );

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Bookings
        .route("/bookings", post(api::bookings::create_booking))
        .route("/bookings/:id", get(api::bookings::get_booking))
        .route("/bookings/:id/history", get(api::bookings::get_booking_history))
        .route("/bookings/:id/rebook", post(api::bookings::rebook))
        .route("/bookings/:id/payment-result", post(api::bookings::record_payment_result))
        .route("/bookings/:id/approve", post(api::bookings::approve_booking))
        .route("/bookings/:id/reject", post(api::bookings::reject_booking))
        .route("/bookings/:id/cancel", post(api::bookings::cancel_booking))
        .route("/bookings/:id/complete", post(api::bookings::complete_booking))
        .route("/bookings/:id/records", get(api::bookings::list_booking_records))
        .route("/bookings/:id/pickup", post(api::routes::mark_booking_complete))
        .route("/students/:id/bookings", get(api::bookings::list_student_bookings))
        // Routes
        .route("/routes/:id/availability", get(api::routes::get_availability))
        .route("/routes/:id/pickup-points", get(api::routes::list_pickup_points))
        .route("/routes/:id/roster", get(api::routes::get_roster))
        .route(
            "/routes/:id/pickup-points/:pickup_point_id/complete",
            post(api::routes::mark_pickup_point_complete),
        )
        .route(
            "/routes/:id/completion",
            get(api::completions::get_completion).post(api::completions::complete_route),
        )
        // Operations
        .route("/operations/expire", post(api::operations::expire_due))
        .route("/operations/rosters", post(api::operations::generate_rosters))
        .route("/operations/sweep", post(api::operations::run_sweep))
        // Events
        .route("/events", get(api::events::stream_events))
        .with_state(state);

    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}
