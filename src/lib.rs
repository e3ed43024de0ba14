//! Equiplend equipment borrowing server
//!
//! Tracks equipment stock and drives borrowing requests from registered
//! borrowers and email-verified guests through approval, hand-off and
//! return, assessing late and damage fees along the way.

use std::sync::Arc;

pub mod api;
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
