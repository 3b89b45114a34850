//! Borrowing (loan of one copy) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Borrowing record from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Borrowing {
    pub id: i32,
    pub book_id: i32,
    #[sqlx(default)]
    pub book_title: Option<String>,
    pub borrower_name: String,
    pub borrower_email: Option<String>,
    pub borrower_phone: Option<String>,
    pub borrower_room_number: Option<String>,
    pub borrower_hotel: Option<String>,
    pub borrowed_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub is_returned: bool,
}

impl Borrowing {
    pub fn is_open(&self) -> bool {
        !self.is_returned
    }
}

/// Borrower details copied onto a new borrowing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Borrower {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub room_number: Option<String>,
    pub hotel: Option<String>,
}

/// Row to insert when a copy is lent out
#[derive(Debug, Clone)]
pub struct NewBorrowing {
    pub book_id: i32,
    pub borrower: Borrower,
}

/// Borrow request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BorrowBook {
    pub book_id: i32,
    #[validate(length(min = 1, max = 255, message = "Borrower name must be 1 to 255 characters"))]
    pub borrower_name: String,
    #[validate(email(message = "Invalid email format"))]
    pub borrower_email: Option<String>,
    #[validate(length(min = 1, max = 20, message = "Phone must be 1 to 20 characters"))]
    pub borrower_phone: Option<String>,
    #[validate(length(min = 1, max = 10, message = "Room number must be 1 to 10 characters"))]
    pub borrower_room_number: String,
    #[validate(length(min = 1, max = 255, message = "Hotel must be 1 to 255 characters"))]
    pub borrower_hotel: String,
}

impl BorrowBook {
    pub fn borrower(&self) -> Borrower {
        Borrower {
            name: self.borrower_name.clone(),
            email: self.borrower_email.clone(),
            phone: self.borrower_phone.clone(),
            room_number: Some(self.borrower_room_number.clone()),
            hotel: Some(self.borrower_hotel.clone()),
        }
    }
}

/// Query parameters for the borrowing listing
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct BorrowingQuery {
    /// `true` for closed borrowings, `false` for open ones
    pub is_returned: Option<String>,
    /// Restrict to one book
    pub book_id: Option<i32>,
    /// Page number (1-based)
    pub page: Option<i64>,
    /// Items per page, 0 returns everything
    pub per_page: Option<i64>,
}

impl BorrowingQuery {
    /// Parsed `is_returned` filter; unrecognised values are ignored
    pub fn returned_filter(&self) -> Option<bool> {
        match self.is_returned.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("true") => Some(true),
            Some("false") => Some(false),
            _ => None,
        }
    }
}
