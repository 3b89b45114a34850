//! Borrowing service: lending through the inventory ledger

use crate::{
    config::PaginationConfig,
    error::AppResult,
    ledger::InventoryLedger,
    models::{
        borrowing::{Borrower, Borrowing, BorrowingQuery},
        pagination::{PageRequest, Pagination},
    },
    repository::{ledger::PgLedgerStore, Repository},
};

#[derive(Clone)]
pub struct BorrowingsService {
    repository: Repository,
    ledger: InventoryLedger<PgLedgerStore>,
    pagination: PaginationConfig,
}

impl BorrowingsService {
    pub fn new(repository: Repository, pagination: PaginationConfig) -> Self {
        let ledger = InventoryLedger::new(repository.ledger_store());
        Self { repository, ledger, pagination }
    }

    /// Borrow one copy of a book
    pub async fn borrow(&self, book_id: i32, borrower: &Borrower) -> AppResult<Borrowing> {
        Ok(self.ledger.borrow(book_id, borrower).await?)
    }

    /// Return a borrowed copy
    pub async fn return_borrowing(&self, borrowing_id: i32) -> AppResult<Borrowing> {
        Ok(self.ledger.return_borrowing(borrowing_id).await?)
    }

    pub async fn list(&self, query: &BorrowingQuery) -> AppResult<(Vec<Borrowing>, Pagination)> {
        let page = PageRequest::resolve(query.page, query.per_page, &self.pagination);
        let (borrowings, total) = self.repository.borrowings.list(query, page).await?;
        Ok((borrowings, Pagination::new(total, page)))
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Borrowing> {
        self.repository.borrowings.get_by_id(id).await
    }
}
