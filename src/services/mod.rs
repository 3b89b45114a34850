//! Business logic services

pub mod books;
pub mod borrowings;
pub mod categories;

use crate::{config::PaginationConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub repository: Repository,
    pub books: books::BooksService,
    pub categories: categories::CategoriesService,
    pub borrowings: borrowings::BorrowingsService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, pagination: PaginationConfig) -> Self {
        Self {
            books: books::BooksService::new(repository.clone(), pagination.clone()),
            categories: categories::CategoriesService::new(repository.clone()),
            borrowings: borrowings::BorrowingsService::new(repository.clone(), pagination),
            repository,
        }
    }
}
