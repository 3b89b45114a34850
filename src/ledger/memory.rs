//! In-process ledger store used by the ledger tests.
//!
//! Rows live in memory and each row has its own async lock, so transactions
//! behave like their Postgres counterparts: a row locked by one transaction
//! blocks every other transaction that tries to lock it until the first one
//! commits or rolls back. Writes are staged per transaction and applied on
//! commit. The table check `0 <= available <= total` is enforced on write.
//! Row locks nobody holds or waits on are evicted when a transaction ends.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex as RowMutex, OwnedMutexGuard};

use super::{LedgerError, LedgerResult, LedgerStore, LedgerTransaction};
use crate::models::{
    book::BookStock,
    borrowing::{Borrowing, NewBorrowing},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RowKey {
    Book(i32),
    Borrowing(i32),
}

/// Storage operation that can be made to fail once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    InsertBorrowing,
    CloseBorrowing,
    Commit,
}

#[derive(Debug, Default)]
struct Tables {
    books: BTreeMap<i32, BookStock>,
    borrowings: BTreeMap<i32, Borrowing>,
}

#[derive(Default)]
struct Inner {
    tables: Mutex<Tables>,
    row_locks: Mutex<HashMap<RowKey, Arc<RowMutex<()>>>>,
    next_book_id: AtomicI32,
    next_borrowing_id: AtomicI32,
    fail_point: Mutex<Option<FailPoint>>,
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone, Default)]
pub struct MemoryLedgerStore {
    inner: Arc<Inner>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a book and return its id
    pub fn add_book(&self, total_quantity: i32, available_quantity: i32) -> i32 {
        let id = self.inner.next_book_id.fetch_add(1, Ordering::SeqCst) + 1;
        guard(&self.inner.tables).books.insert(
            id,
            BookStock {
                id,
                total_quantity,
                available_quantity,
            },
        );
        id
    }

    /// Committed state of a book
    pub fn book(&self, book_id: i32) -> Option<BookStock> {
        guard(&self.inner.tables).books.get(&book_id).copied()
    }

    /// Committed state of a borrowing
    pub fn borrowing(&self, borrowing_id: i32) -> Option<Borrowing> {
        guard(&self.inner.tables).borrowings.get(&borrowing_id).cloned()
    }

    pub fn open_borrowings(&self, book_id: i32) -> usize {
        guard(&self.inner.tables)
            .borrowings
            .values()
            .filter(|b| b.book_id == book_id && b.is_open())
            .count()
    }

    /// Overwrite the total of a book outside of any transaction, bypassing
    /// the table check. Used to reproduce inconsistent data.
    pub fn force_total_quantity(&self, book_id: i32, total_quantity: i32) {
        if let Some(book) = guard(&self.inner.tables).books.get_mut(&book_id) {
            book.total_quantity = total_quantity;
        }
    }

    /// Number of rows with a live lock entry
    pub fn lock_entries(&self) -> usize {
        guard(&self.inner.row_locks).len()
    }

    /// Make the next call of the given operation fail
    pub fn fail_next(&self, point: FailPoint) {
        *guard(&self.inner.fail_point) = Some(point);
    }

    fn take_failure(&self, point: FailPoint) -> LedgerResult<()> {
        let mut slot = guard(&self.inner.fail_point);
        if *slot == Some(point) {
            *slot = None;
            return Err(LedgerError::Internal(format!("injected failure at {:?}", point)));
        }
        Ok(())
    }

    fn row_lock(&self, key: RowKey) -> Arc<RowMutex<()>> {
        guard(&self.inner.row_locks)
            .entry(key)
            .or_insert_with(|| Arc::new(RowMutex::new(())))
            .clone()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    type Tx = MemoryTransaction;

    async fn begin(&self) -> LedgerResult<Self::Tx> {
        Ok(MemoryTransaction {
            store: self.clone(),
            held: HashMap::new(),
            books: HashMap::new(),
            borrowings: HashMap::new(),
        })
    }
}

pub struct MemoryTransaction {
    store: MemoryLedgerStore,
    held: HashMap<RowKey, OwnedMutexGuard<()>>,
    books: HashMap<i32, BookStock>,
    borrowings: HashMap<i32, Borrowing>,
}

impl MemoryTransaction {
    async fn lock(&mut self, key: RowKey) {
        if self.held.contains_key(&key) {
            return;
        }
        let row = self.store.row_lock(key);
        let held = row.lock_owned().await;
        self.held.insert(key, held);
    }

    fn require_lock(&self, key: RowKey) -> LedgerResult<()> {
        if self.held.contains_key(&key) {
            Ok(())
        } else {
            Err(LedgerError::Internal(format!("{:?} is not locked by this transaction", key)))
        }
    }

    fn current_book(&self, book_id: i32) -> Option<BookStock> {
        self.books
            .get(&book_id)
            .copied()
            .or_else(|| self.store.book(book_id))
    }

    fn current_borrowing(&self, borrowing_id: i32) -> Option<Borrowing> {
        self.borrowings
            .get(&borrowing_id)
            .cloned()
            .or_else(|| self.store.borrowing(borrowing_id))
    }
}

#[async_trait]
impl LedgerTransaction for MemoryTransaction {
    async fn lock_book(&mut self, book_id: i32) -> LedgerResult<Option<BookStock>> {
        self.lock(RowKey::Book(book_id)).await;
        Ok(self.current_book(book_id))
    }

    async fn lock_open_borrowing(&mut self, borrowing_id: i32) -> LedgerResult<Option<Borrowing>> {
        self.lock(RowKey::Borrowing(borrowing_id)).await;
        Ok(self.current_borrowing(borrowing_id).filter(Borrowing::is_open))
    }

    async fn update_book_available(&mut self, book_id: i32, available: i32) -> LedgerResult<()> {
        self.require_lock(RowKey::Book(book_id))?;
        let mut stock = self
            .current_book(book_id)
            .ok_or_else(|| LedgerError::Internal(format!("Book {} vanished", book_id)))?;

        stock.available_quantity = available;
        if !stock.is_consistent() {
            return Err(LedgerError::Internal(format!(
                "check constraint violated for book {}: available {} total {}",
                book_id, stock.available_quantity, stock.total_quantity
            )));
        }
        self.books.insert(book_id, stock);
        Ok(())
    }

    async fn insert_borrowing(
        &mut self,
        borrowing: &NewBorrowing,
        borrowed_at: DateTime<Utc>,
    ) -> LedgerResult<Borrowing> {
        self.store.take_failure(FailPoint::InsertBorrowing)?;
        if self.current_book(borrowing.book_id).is_none() {
            return Err(LedgerError::Internal(format!(
                "foreign key violation: book {} does not exist",
                borrowing.book_id
            )));
        }

        let id = self.store.inner.next_borrowing_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.lock(RowKey::Borrowing(id)).await;

        let borrower = &borrowing.borrower;
        let row = Borrowing {
            id,
            book_id: borrowing.book_id,
            book_title: None,
            borrower_name: borrower.name.clone(),
            borrower_email: borrower.email.clone(),
            borrower_phone: borrower.phone.clone(),
            borrower_room_number: borrower.room_number.clone(),
            borrower_hotel: borrower.hotel.clone(),
            borrowed_at,
            returned_at: None,
            is_returned: false,
        };
        self.borrowings.insert(id, row.clone());
        Ok(row)
    }

    async fn close_borrowing(
        &mut self,
        borrowing_id: i32,
        returned_at: DateTime<Utc>,
    ) -> LedgerResult<Borrowing> {
        self.store.take_failure(FailPoint::CloseBorrowing)?;
        self.require_lock(RowKey::Borrowing(borrowing_id))?;

        let mut row = self.current_borrowing(borrowing_id).ok_or_else(|| {
            LedgerError::Internal(format!("Borrowing {} vanished", borrowing_id))
        })?;
        row.is_returned = true;
        row.returned_at = Some(returned_at);
        self.borrowings.insert(borrowing_id, row.clone());
        Ok(row)
    }

    async fn commit(mut self) -> LedgerResult<()> {
        self.store.take_failure(FailPoint::Commit)?;

        let mut tables = guard(&self.store.inner.tables);
        tables.books.extend(std::mem::take(&mut self.books));
        tables.borrowings.extend(std::mem::take(&mut self.borrowings));
        drop(tables);

        // row locks are released when `self` drops here
        Ok(())
    }

    async fn rollback(self) -> LedgerResult<()> {
        Ok(())
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        let keys: Vec<RowKey> = self.held.keys().copied().collect();
        self.held.clear();

        // a waiter holds its own clone of the row lock, so a count of one
        // under the map mutex means the entry is idle
        let mut locks = guard(&self.store.inner.row_locks);
        for key in keys {
            if locks.get(&key).is_some_and(|row| Arc::strong_count(row) == 1) {
                locks.remove(&key);
            }
        }
    }
}
