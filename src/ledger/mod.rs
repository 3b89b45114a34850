//! Inventory ledger: borrow and return transactions
//!
//! Each operation runs in a single storage transaction. The rows it touches
//! are locked before they are read and stay locked until commit or rollback,
//! so concurrent requests against the same book are serialized and always
//! see the current quantity. Lock order: `borrow` locks the book only,
//! `return_borrowing` locks the borrowing and then its book.

#[cfg(test)]
mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{
    book::BookStock,
    borrowing::{Borrower, Borrowing, NewBorrowing},
};

/// Outcome of a failed ledger operation
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Book {0} not found")]
    NotFound(i32),

    #[error("Book {0} is not available for borrowing")]
    Unavailable(i32),

    #[error("Active borrowing record {0} not found")]
    NotFoundOrAlreadyReturned(i32),

    #[error("Cannot return borrowing {borrowing_id}: available quantity of book {book_id} would exceed total quantity")]
    InvariantViolation { book_id: i32, borrowing_id: i32 },

    #[error("Cannot reduce total quantity to {requested}: {borrowed} copies are on loan")]
    TotalBelowBorrowed { requested: i32, borrowed: i32 },

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Storage or unexpected failures, as opposed to business rejections
    pub fn is_internal(&self) -> bool {
        matches!(self, LedgerError::Storage(_) | LedgerError::Internal(_))
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Source of per-request transactions
#[async_trait]
pub trait LedgerStore: Send + Sync {
    type Tx: LedgerTransaction;

    async fn begin(&self) -> LedgerResult<Self::Tx>;
}

/// One storage transaction. Locks taken through it are held until
/// `commit` or `rollback`; dropping it without committing discards
/// every write.
#[async_trait]
pub trait LedgerTransaction: Send + Sized {
    /// Lock a book row for update and read its quantities
    async fn lock_book(&mut self, book_id: i32) -> LedgerResult<Option<BookStock>>;

    /// Lock a borrowing row for update, only if it is still open
    async fn lock_open_borrowing(&mut self, borrowing_id: i32) -> LedgerResult<Option<Borrowing>>;

    /// Write the available quantity of a book locked by this transaction
    async fn update_book_available(&mut self, book_id: i32, available: i32) -> LedgerResult<()>;

    async fn insert_borrowing(
        &mut self,
        borrowing: &NewBorrowing,
        borrowed_at: DateTime<Utc>,
    ) -> LedgerResult<Borrowing>;

    /// Mark a borrowing locked by this transaction as returned
    async fn close_borrowing(
        &mut self,
        borrowing_id: i32,
        returned_at: DateTime<Utc>,
    ) -> LedgerResult<Borrowing>;

    async fn commit(self) -> LedgerResult<()>;

    async fn rollback(self) -> LedgerResult<()>;
}

/// Borrow/return service over a transactional store
#[derive(Clone)]
pub struct InventoryLedger<S> {
    store: S,
}

impl<S: LedgerStore> InventoryLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Lend one copy of a book and record the borrowing
    pub async fn borrow(&self, book_id: i32, borrower: &Borrower) -> LedgerResult<Borrowing> {
        let mut tx = self.store.begin().await?;
        let result = borrow_locked(&mut tx, book_id, borrower).await;
        let borrowing = finish(tx, result).await?;

        tracing::info!(book_id, borrowing_id = borrowing.id, "Book borrowed");
        Ok(borrowing)
    }

    /// Close an open borrowing and put its copy back on the shelf
    pub async fn return_borrowing(&self, borrowing_id: i32) -> LedgerResult<Borrowing> {
        let mut tx = self.store.begin().await?;
        let result = return_locked(&mut tx, borrowing_id).await;
        let borrowing = finish(tx, result).await?;

        tracing::info!(
            book_id = borrowing.book_id,
            borrowing_id,
            "Book returned"
        );
        Ok(borrowing)
    }
}

async fn borrow_locked<T: LedgerTransaction>(
    tx: &mut T,
    book_id: i32,
    borrower: &Borrower,
) -> LedgerResult<Borrowing> {
    let stock = tx
        .lock_book(book_id)
        .await?
        .ok_or(LedgerError::NotFound(book_id))?;

    if stock.available_quantity <= 0 {
        return Err(LedgerError::Unavailable(book_id));
    }

    tx.update_book_available(book_id, stock.available_quantity - 1)
        .await?;

    let new_borrowing = NewBorrowing {
        book_id,
        borrower: borrower.clone(),
    };
    tx.insert_borrowing(&new_borrowing, Utc::now()).await
}

async fn return_locked<T: LedgerTransaction>(
    tx: &mut T,
    borrowing_id: i32,
) -> LedgerResult<Borrowing> {
    let borrowing = tx
        .lock_open_borrowing(borrowing_id)
        .await?
        .ok_or(LedgerError::NotFoundOrAlreadyReturned(borrowing_id))?;

    let stock = tx.lock_book(borrowing.book_id).await?.ok_or_else(|| {
        LedgerError::Internal(format!(
            "Book {} of borrowing {} is missing",
            borrowing.book_id, borrowing_id
        ))
    })?;

    if stock.available_quantity >= stock.total_quantity {
        return Err(LedgerError::InvariantViolation {
            book_id: stock.id,
            borrowing_id,
        });
    }

    tx.update_book_available(stock.id, stock.available_quantity + 1)
        .await?;
    tx.close_borrowing(borrowing_id, Utc::now()).await
}

/// Commit on success, roll back on any error. The original error is
/// returned even if the rollback itself fails.
async fn finish<T: LedgerTransaction, R>(tx: T, result: LedgerResult<R>) -> LedgerResult<R> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if err.is_internal() {
                tracing::error!("Ledger transaction failed: {}", err);
            } else {
                tracing::warn!("Ledger operation rejected: {}", err);
            }
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!("Rollback failed: {}", rollback_err);
            }
            Err(err)
        }
    }
}

/// New quantities of a book after an administrative change of its total
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantityAdjustment {
    pub total_quantity: i32,
    pub available_quantity: i32,
}

/// Apply a new total to a locked book row, keeping the number of copies
/// on loan unchanged. The new total may not go below that number.
pub fn adjust_total_quantity(stock: &BookStock, new_total: i32) -> LedgerResult<QuantityAdjustment> {
    let borrowed = stock.borrowed();
    if new_total < borrowed || new_total < 0 {
        return Err(LedgerError::TotalBelowBorrowed {
            requested: new_total,
            borrowed,
        });
    }

    Ok(QuantityAdjustment {
        total_quantity: new_total,
        available_quantity: stock.available_quantity + (new_total - stock.total_quantity),
    })
}
