//! Data models

pub mod book;
pub mod borrowing;
pub mod category;
pub mod pagination;

// Re-export commonly used types
pub use book::{Book, BookStock};
pub use borrowing::{Borrower, Borrowing};
pub use category::Category;
pub use pagination::{PageRequest, Pagination};
