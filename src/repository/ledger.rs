//! Postgres implementation of the ledger storage traits

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Transaction};

use crate::{
    ledger::{LedgerError, LedgerResult, LedgerStore, LedgerTransaction},
    models::{
        book::BookStock,
        borrowing::{Borrowing, NewBorrowing},
    },
};

#[derive(Clone)]
pub struct PgLedgerStore {
    pool: Pool<Postgres>,
}

impl PgLedgerStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    type Tx = PgLedgerTransaction;

    async fn begin(&self) -> LedgerResult<Self::Tx> {
        let tx = self.pool.begin().await?;
        Ok(PgLedgerTransaction { tx })
    }
}

/// Open Postgres transaction. Row locks are `SELECT ... FOR UPDATE` locks;
/// sqlx rolls the transaction back if it is dropped uncommitted.
pub struct PgLedgerTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTransaction for PgLedgerTransaction {
    async fn lock_book(&mut self, book_id: i32) -> LedgerResult<Option<BookStock>> {
        let stock = sqlx::query_as::<_, BookStock>(
            // language=postgresql
            r#"
            SELECT id, total_quantity, available_quantity
            FROM books
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(book_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(stock)
    }

    async fn lock_open_borrowing(&mut self, borrowing_id: i32) -> LedgerResult<Option<Borrowing>> {
        let borrowing = sqlx::query_as::<_, Borrowing>(
            // language=postgresql
            r#"
            SELECT *
            FROM borrowings
            WHERE id = $1 AND is_returned = FALSE
            FOR UPDATE
            "#,
        )
        .bind(borrowing_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(borrowing)
    }

    async fn update_book_available(&mut self, book_id: i32, available: i32) -> LedgerResult<()> {
        let result = sqlx::query(
            "UPDATE books SET available_quantity = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(available)
        .bind(book_id)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() != 1 {
            return Err(LedgerError::Internal(format!(
                "Book {} was not updated",
                book_id
            )));
        }
        Ok(())
    }

    async fn insert_borrowing(
        &mut self,
        borrowing: &NewBorrowing,
        borrowed_at: DateTime<Utc>,
    ) -> LedgerResult<Borrowing> {
        let borrower = &borrowing.borrower;
        let row = sqlx::query_as::<_, Borrowing>(
            // language=postgresql
            r#"
            WITH inserted AS (
                INSERT INTO borrowings (
                    book_id, borrower_name, borrower_email, borrower_phone,
                    borrower_room_number, borrower_hotel, borrowed_at, is_returned
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE)
                RETURNING *
            )
            SELECT inserted.*, b.title AS book_title
            FROM inserted
            JOIN books b ON b.id = inserted.book_id
            "#,
        )
        .bind(borrowing.book_id)
        .bind(&borrower.name)
        .bind(&borrower.email)
        .bind(&borrower.phone)
        .bind(&borrower.room_number)
        .bind(&borrower.hotel)
        .bind(borrowed_at)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row)
    }

    async fn close_borrowing(
        &mut self,
        borrowing_id: i32,
        returned_at: DateTime<Utc>,
    ) -> LedgerResult<Borrowing> {
        let row = sqlx::query_as::<_, Borrowing>(
            // language=postgresql
            r#"
            WITH closed AS (
                UPDATE borrowings
                SET is_returned = TRUE, returned_at = $1
                WHERE id = $2
                RETURNING *
            )
            SELECT closed.*, b.title AS book_title
            FROM closed
            JOIN books b ON b.id = closed.book_id
            "#,
        )
        .bind(returned_at)
        .bind(borrowing_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row)
    }

    async fn commit(self) -> LedgerResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> LedgerResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
