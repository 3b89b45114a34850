//! Book model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Book record, optionally joined with its category name
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    /// ISBN-10 or ISBN-13, unique across the catalog
    pub isbn: String,
    pub image_url: Option<String>,
    /// Number of copies owned by the library
    pub total_quantity: i32,
    /// Number of copies currently on the shelf
    pub available_quantity: i32,
    pub category_id: Option<i32>,
    #[sqlx(default)]
    pub category_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Quantity columns of a book row, as read under a row lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct BookStock {
    pub id: i32,
    pub total_quantity: i32,
    pub available_quantity: i32,
}

impl BookStock {
    /// Number of copies currently out on open borrowings
    pub fn borrowed(&self) -> i32 {
        self.total_quantity - self.available_quantity
    }

    pub fn is_consistent(&self) -> bool {
        0 <= self.available_quantity && self.available_quantity <= self.total_quantity
    }
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 255, message = "Author must be 1 to 255 characters"))]
    pub author: String,
    #[validate(length(min = 10, max = 20, message = "ISBN must be 10 to 20 characters"))]
    pub isbn: String,
    #[validate(range(min = 0, message = "Total quantity cannot be negative"))]
    pub total_quantity: i32,
    pub category_id: i32,
    pub image_url: Option<String>,
}

/// Update book request.
///
/// Every field is optional; absent fields are left untouched. `image_url` and
/// `category_id` distinguish an absent field from an explicit `null`, which
/// clears the column. The available quantity is never set directly: it
/// follows `total_quantity` so that the number of copies on loan is preserved.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Author must be 1 to 255 characters"))]
    pub author: Option<String>,
    #[validate(length(min = 10, max = 20, message = "ISBN must be 10 to 20 characters"))]
    pub isbn: Option<String>,
    #[validate(range(min = 0, message = "Total quantity cannot be negative"))]
    pub total_quantity: Option<i32>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<i32>)]
    pub category_id: Option<Option<i32>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub image_url: Option<Option<String>>,
}

/// Query parameters for the book listing
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    /// Case-insensitive match on title, author or ISBN
    pub search: Option<String>,
    /// Filter by category name
    pub category: Option<String>,
    /// `true` keeps only books with at least one copy available
    pub available: Option<String>,
    /// Page number (1-based)
    pub page: Option<i64>,
    /// Items per page, 0 returns everything
    pub per_page: Option<i64>,
}

impl BookQuery {
    pub fn only_available(&self) -> bool {
        self.available
            .as_deref()
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }
}
