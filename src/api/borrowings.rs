//! Borrowing endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        borrowing::{BorrowBook, Borrowing, BorrowingQuery},
        pagination::Pagination,
    },
};

use super::ApiKey;

/// Paginated borrowings response
#[derive(Serialize, ToSchema)]
pub struct BorrowingsListResponse {
    pub borrowings: Vec<Borrowing>,
    pub pagination: Pagination,
}

/// List borrowing records, most recent first
#[utoipa::path(
    get,
    path = "/borrowings",
    tag = "borrowings",
    params(BorrowingQuery),
    responses(
        (status = 200, description = "Borrowing records", body = BorrowingsListResponse)
    )
)]
pub async fn list_borrowings(
    State(state): State<crate::AppState>,
    Query(query): Query<BorrowingQuery>,
) -> AppResult<Json<BorrowingsListResponse>> {
    let (borrowings, pagination) = state.services.borrowings.list(&query).await?;
    Ok(Json(BorrowingsListResponse { borrowings, pagination }))
}

/// Get borrowing record by ID
#[utoipa::path(
    get,
    path = "/borrowings/{id}",
    tag = "borrowings",
    params(("id" = i32, Path, description = "Borrowing ID")),
    responses(
        (status = 200, description = "Borrowing record", body = Borrowing),
        (status = 404, description = "Borrowing not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_borrowing(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Borrowing>> {
    let borrowing = state.services.borrowings.get_by_id(id).await?;
    Ok(Json(borrowing))
}

/// Borrow one copy of a book
#[utoipa::path(
    post,
    path = "/borrowings/borrow",
    tag = "borrowings",
    security(("api_key" = [])),
    request_body = BorrowBook,
    responses(
        (status = 201, description = "Book borrowed", body = Borrowing),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "No copy available", body = crate::error::ErrorResponse)
    )
)]
pub async fn borrow_book(
    State(state): State<crate::AppState>,
    _key: ApiKey,
    Json(request): Json<BorrowBook>,
) -> AppResult<(StatusCode, Json<Borrowing>)> {
    request.validate()?;

    let borrowing = state
        .services
        .borrowings
        .borrow(request.book_id, &request.borrower())
        .await?;
    Ok((StatusCode::CREATED, Json(borrowing)))
}

/// Return a borrowed copy
#[utoipa::path(
    patch,
    path = "/borrowings/return/{id}",
    tag = "borrowings",
    security(("api_key" = [])),
    params(("id" = i32, Path, description = "Borrowing ID")),
    responses(
        (status = 200, description = "Book returned", body = Borrowing),
        (status = 404, description = "No open borrowing with this ID", body = crate::error::ErrorResponse),
        (status = 409, description = "Available quantity would exceed total", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<crate::AppState>,
    _key: ApiKey,
    Path(borrowing_id): Path<i32>,
) -> AppResult<Json<Borrowing>> {
    let borrowing = state
        .services
        .borrowings
        .return_borrowing(borrowing_id)
        .await?;
    Ok(Json(borrowing))
}
