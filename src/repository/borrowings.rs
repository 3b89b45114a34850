//! Borrowings repository: read side of the lending records

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        borrowing::{Borrowing, BorrowingQuery},
        pagination::PageRequest,
    },
};

const SELECT_BORROWING: &str = r#"
    SELECT br.*, b.title AS book_title
    FROM borrowings br
    JOIN books b ON b.id = br.book_id
"#;

#[derive(Clone)]
pub struct BorrowingsRepository {
    pool: Pool<Postgres>,
}

impl BorrowingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List borrowings, most recent first
    pub async fn list(&self, query: &BorrowingQuery, page: PageRequest) -> AppResult<(Vec<Borrowing>, i64)> {
        let mut conditions = Vec::new();
        let mut idx = 1;

        let returned = query.returned_filter();
        if returned.is_some() {
            conditions.push(format!("br.is_returned = ${}", idx));
            idx += 1;
        }
        if query.book_id.is_some() {
            conditions.push(format!("br.book_id = ${}", idx));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_q = format!("SELECT COUNT(*) FROM borrowings br {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_q);
        if let Some(r) = returned { count_builder = count_builder.bind(r); }
        if let Some(b) = query.book_id { count_builder = count_builder.bind(b); }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_q = format!(
            "{} {} ORDER BY br.borrowed_at DESC, br.id DESC {}",
            SELECT_BORROWING,
            where_clause,
            page.limit_clause()
        );
        let mut builder = sqlx::query_as::<_, Borrowing>(&select_q);
        if let Some(r) = returned { builder = builder.bind(r); }
        if let Some(b) = query.book_id { builder = builder.bind(b); }

        let rows = builder.fetch_all(&self.pool).await?;
        Ok((rows, total))
    }

    /// Get borrowing by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Borrowing> {
        sqlx::query_as::<_, Borrowing>(&format!("{} WHERE br.id = $1", SELECT_BORROWING))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrowing record {} not found", id)))
    }
}
