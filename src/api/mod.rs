//! API handlers for the lending REST endpoints

pub mod books;
pub mod borrowings;
pub mod categories;
pub mod health;
pub mod openapi;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::{error::AppError, AppState};

/// Header carrying the key for mutating requests
pub const API_KEY_HEADER: &str = "Api-Key";

/// Extractor guarding mutating endpoints with the configured API key
pub struct ApiKey;

#[async_trait]
impl FromRequestParts<AppState> for ApiKey {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let provided = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok());

        match (provided, state.config.auth.api_key.as_deref()) {
            (Some(provided), Some(expected)) if provided == expected => Ok(ApiKey),
            _ => {
                tracing::warn!(
                    "Unauthorized {} {}: missing or invalid '{}' header",
                    parts.method,
                    parts.uri.path(),
                    API_KEY_HEADER
                );
                Err(AppError::Authentication(
                    "Invalid or missing API key".to_string(),
                ))
            }
        }
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Books
        .route("/books", get(books::list_books).post(books::create_book))
        .route(
            "/books/:id",
            get(books::get_book)
                .patch(books::update_book)
                .delete(books::delete_book),
        )
        // Categories
        .route(
            "/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/categories/:id",
            get(categories::get_category)
                .patch(categories::update_category)
                .delete(categories::delete_category),
        )
        // Borrowings
        .route("/borrowings", get(borrowings::list_borrowings))
        .route("/borrowings/:id", get(borrowings::get_borrowing))
        .route("/borrowings/borrow", post(borrowings::borrow_book))
        .route("/borrowings/return/:id", patch(borrowings::return_book))
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .merge(openapi::create_openapi_router())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
}
