//! Book catalog service

use crate::{
    config::PaginationConfig,
    error::AppResult,
    models::{
        book::{Book, BookQuery, CreateBook, UpdateBook},
        pagination::{PageRequest, Pagination},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct BooksService {
    repository: Repository,
    pagination: PaginationConfig,
}

impl BooksService {
    pub fn new(repository: Repository, pagination: PaginationConfig) -> Self {
        Self { repository, pagination }
    }

    /// Search books and return one page with its metadata
    pub async fn search(&self, query: &BookQuery) -> AppResult<(Vec<Book>, Pagination)> {
        let page = PageRequest::resolve(query.page, query.per_page, &self.pagination);
        let (books, total) = self.repository.books.search(query, page).await?;
        Ok((books, Pagination::new(total, page)))
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    pub async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let created = self.repository.books.create(book).await?;
        tracing::info!(book_id = created.id, isbn = %created.isbn, "Book created");
        Ok(created)
    }

    pub async fn update(&self, id: i32, data: &UpdateBook) -> AppResult<Book> {
        self.repository.books.update(id, data).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await?;
        tracing::info!(book_id = id, "Book deleted");
        Ok(())
    }
}
