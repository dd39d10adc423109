//! Schoolride transportation server
//!
//! Booking and daily operations engine for private child transportation:
//! seat-limited route bookings, plan pricing, and idempotent tracking of
//! daily pickups and route completions, served as a REST JSON API.

use std::sync::Arc;

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
