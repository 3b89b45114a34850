//! Library lending server
//!
//! Tracks a book inventory grouped into categories and lends copies out,
//! keeping every book's available-copy count in step with its open
//! borrowings. The borrow/return transactions live in [`ledger`]; the rest
//! is a REST JSON API over PostgreSQL.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod ledger;
pub mod logging;
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
