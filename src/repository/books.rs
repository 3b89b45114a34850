//! Books repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    ledger::adjust_total_quantity,
    models::{
        book::{Book, BookQuery, BookStock, CreateBook, UpdateBook},
        pagination::PageRequest,
    },
};

const SELECT_BOOK: &str = r#"
    SELECT b.*, c.name AS category_name
    FROM books b
    LEFT JOIN categories c ON c.id = b.category_id
"#;

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Search books with filters and pagination
    pub async fn search(&self, query: &BookQuery, page: PageRequest) -> AppResult<(Vec<Book>, i64)> {
        let mut conditions = Vec::new();
        let mut idx = 1;

        let search = query
            .search
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        if search.is_some() {
            conditions.push(format!(
                "(b.title ILIKE ${0} OR b.author ILIKE ${0} OR b.isbn ILIKE ${0})",
                idx
            ));
            idx += 1;
        }
        if query.category.is_some() {
            conditions.push(format!("c.name = ${}", idx));
        }
        if query.only_available() {
            conditions.push("b.available_quantity > 0".to_string());
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_q = format!(
            "SELECT COUNT(*) FROM books b LEFT JOIN categories c ON c.id = b.category_id {}",
            where_clause
        );
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_q);
        if let Some(ref s) = search { count_builder = count_builder.bind(s); }
        if let Some(ref c) = query.category { count_builder = count_builder.bind(c); }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_q = format!(
            "{} {} ORDER BY b.id {}",
            SELECT_BOOK,
            where_clause,
            page.limit_clause()
        );
        let mut builder = sqlx::query_as::<_, Book>(&select_q);
        if let Some(ref s) = search { builder = builder.bind(s); }
        if let Some(ref c) = query.category { builder = builder.bind(c); }

        let rows = builder.fetch_all(&self.pool).await?;
        Ok((rows, total))
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(&format!("{} WHERE b.id = $1", SELECT_BOOK))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))
    }

    /// Create a book with every copy available
    pub async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let category_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)")
                .bind(book.category_id)
                .fetch_one(&self.pool)
                .await?;

        if !category_exists {
            return Err(AppError::NotFound(format!(
                "Category with id {} not found",
                book.category_id
            )));
        }

        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO books (title, author, isbn, image_url, total_quantity, available_quantity, category_id)
            VALUES ($1, $2, $3, $4, $5, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(&book.image_url)
        .bind(book.total_quantity)
        .bind(book.category_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::from(e)
                .on_unique_violation("Failed to create book. ISBN might already exist")
                .on_foreign_key_violation("Category not found")
        })?;

        self.get_by_id(id).await
    }

    /// Update a book field by field.
    ///
    /// The row is locked for the whole update so that a concurrent borrow or
    /// return cannot interleave with the quantity adjustment.
    pub async fn update(&self, id: i32, data: &UpdateBook) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let stock = sqlx::query_as::<_, BookStock>(
            "SELECT id, total_quantity, available_quantity FROM books WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))?;

        let total = data.total_quantity.unwrap_or(stock.total_quantity);
        let quantities = adjust_total_quantity(&stock, total)?;

        sqlx::query(
            r#"
            UPDATE books SET
                title = COALESCE($2, title),
                author = COALESCE($3, author),
                isbn = COALESCE($4, isbn),
                image_url = CASE WHEN $5 THEN $6 ELSE image_url END,
                category_id = CASE WHEN $7 THEN $8 ELSE category_id END,
                total_quantity = $9,
                available_quantity = $10,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&data.title)
        .bind(&data.author)
        .bind(&data.isbn)
        .bind(data.image_url.is_some())
        .bind(data.image_url.clone().flatten())
        .bind(data.category_id.is_some())
        .bind(data.category_id.flatten())
        .bind(quantities.total_quantity)
        .bind(quantities.available_quantity)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::from(e)
                .on_unique_violation("Update failed. ISBN might already exist")
                .on_foreign_key_violation("Category not found")
        })?;

        tx.commit().await?;

        tracing::info!(
            book_id = id,
            total = quantities.total_quantity,
            available = quantities.available_quantity,
            "Book updated"
        );
        self.get_by_id(id).await
    }

    /// Delete a book and its closed borrowings.
    ///
    /// Refused while any borrowing of the book is open. The book row is
    /// locked first, which also blocks new borrows until the delete ends.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query_scalar::<_, i32>("SELECT id FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))?;

        let has_open: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM borrowings WHERE book_id = $1 AND is_returned = FALSE)",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if has_open {
            return Err(AppError::BusinessRule(
                "Cannot delete book with active borrowing records".to_string(),
            ));
        }

        sqlx::query("DELETE FROM borrowings WHERE book_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
