//! Page selection and pagination metadata shared by the list endpoints

use serde::Serialize;
use utoipa::ToSchema;

use crate::config::PaginationConfig;

/// Resolved page selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest {
    /// Every matching row as a single page
    All,
    Page { page: i64, per_page: i64 },
}

impl PageRequest {
    /// Resolve raw query parameters. A `per_page` of 0 selects everything.
    /// The page is capped so that its offset still fits in an `i64`.
    pub fn resolve(page: Option<i64>, per_page: Option<i64>, config: &PaginationConfig) -> Self {
        match per_page.unwrap_or(config.default_per_page) {
            0 => PageRequest::All,
            n => {
                let per_page = n.clamp(1, config.max_per_page.max(1));
                PageRequest::Page {
                    page: page.unwrap_or(1).clamp(1, i64::MAX / per_page),
                    per_page,
                }
            }
        }
    }

    /// `LIMIT ... OFFSET ...` clause, empty when everything is requested
    pub fn limit_clause(&self) -> String {
        match self {
            PageRequest::All => String::new(),
            PageRequest::Page { page, per_page } => {
                format!("LIMIT {} OFFSET {}", per_page, (page - 1).saturating_mul(*per_page))
            }
        }
    }
}

/// Pagination metadata returned next to a page of results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Pagination {
    pub total: i64,
    pub pages: i64,
    pub page: i64,
    pub per_page: i64,
    pub has_next: bool,
    pub has_prev: bool,
    pub next_num: Option<i64>,
    pub prev_num: Option<i64>,
}

impl Pagination {
    pub fn new(total: i64, request: PageRequest) -> Self {
        match request {
            PageRequest::All => Self {
                total,
                pages: 1,
                page: 1,
                per_page: total,
                has_next: false,
                has_prev: false,
                next_num: None,
                prev_num: None,
            },
            PageRequest::Page { page, per_page } => {
                let pages = (total + per_page - 1) / per_page;
                let has_next = page < pages;
                let has_prev = page > 1;
                Self {
                    total,
                    pages,
                    page,
                    per_page,
                    has_next,
                    has_prev,
                    next_num: has_next.then_some(page + 1),
                    prev_num: has_prev.then_some(page - 1),
                }
            }
        }
    }
}
