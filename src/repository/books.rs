//! In-memory book storage

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, BookShort},
};

/// Ordered list of books shared by every handler
#[derive(Clone, Default)]
pub struct BooksRepository {
    books: Arc<RwLock<Vec<Book>>>,
}

impl BooksRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Summaries of every book passing `query`, in insertion order
    pub async fn list(&self, query: &BookQuery) -> Vec<BookShort> {
        let books = self.books.read().await;
        books
            .iter()
            .filter(|book| query.matches(book))
            .map(BookShort::from)
            .collect()
    }

    pub async fn get_by_id(&self, id: &str) -> Option<Book> {
        let books = self.books.read().await;
        books.iter().find(|book| book.id == id).cloned()
    }

    pub async fn count(&self) -> usize {
        self.books.read().await.len()
    }

    /// Append a book; fails when its id is already taken
    pub async fn insert(&self, book: Book) -> AppResult<()> {
        let mut books = self.books.write().await;
        if books.iter().any(|existing| existing.id == book.id) {
            return Err(AppError::Conflict(format!("Book {} already exists", book.id)));
        }
        books.push(book);
        Ok(())
    }

    /// Mutate the book with `id` in place. Returns `None` when absent.
    pub async fn update<F>(&self, id: &str, edit: F) -> Option<Book>
    where
        F: FnOnce(&mut Book),
    {
        let mut books = self.books.write().await;
        let book = books.iter_mut().find(|book| book.id == id)?;
        edit(book);
        Some(book.clone())
    }

    /// Remove the book with `id`, keeping the order of the rest
    pub async fn delete(&self, id: &str) -> Option<Book> {
        let mut books = self.books.write().await;
        let index = books.iter().position(|book| book.id == id)?;
        Some(books.remove(index))
    }
}
