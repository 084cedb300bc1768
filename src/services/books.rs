//! Bookshelf service: validation, id generation and derived fields

use chrono::Utc;
use rand::Rng;

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookPayload, BookQuery, BookShort},
    repository::Repository,
};

/// URL-safe alphabet used for book ids
const ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";
const ID_LENGTH: usize = 16;
const MAX_ID_ATTEMPTS: usize = 5;

/// Which write a payload is validated for; selects the user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Add,
    Update,
}

impl Action {
    fn prefix(self) -> &'static str {
        match self {
            Action::Add => "Gagal menambahkan buku",
            Action::Update => "Gagal memperbarui buku",
        }
    }
}

#[derive(Clone)]
pub struct BooksService {
    repository: Repository,
}

impl BooksService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Validate and store a new book, returning its id
    pub async fn create(&self, payload: BookPayload) -> AppResult<String> {
        let name = validate(&payload, Action::Add)?;
        let now = Utc::now();
        let mut book = Book::new(generate_id(), name, payload, now);

        for attempt in 1..=MAX_ID_ATTEMPTS {
            match self.repository.books.insert(book.clone()).await {
                Ok(()) => {
                    tracing::info!("Book created: id={} name={:?}", book.id, book.name);
                    return Ok(book.id);
                }
                Err(AppError::Conflict(_)) => {
                    tracing::warn!("Book id collision on attempt {}: {}", attempt, book.id);
                    book.id = generate_id();
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::Internal(format!(
            "Could not allocate a unique book id after {} attempts",
            MAX_ID_ATTEMPTS
        )))
    }

    pub async fn list(&self, query: &BookQuery) -> Vec<BookShort> {
        let books = self.repository.books.list(query).await;
        tracing::debug!("Listed {} books with filters {:?}", books.len(), query);
        books
    }

    pub async fn get_by_id(&self, id: &str) -> AppResult<Book> {
        self.repository
            .books
            .get_by_id(id)
            .await
            .ok_or_else(|| AppError::NotFound("Buku tidak ditemukan".to_string()))
    }

    /// Replace the editable fields of an existing book.
    /// The payload is validated before the lookup.
    pub async fn update(&self, id: &str, payload: BookPayload) -> AppResult<Book> {
        let name = validate(&payload, Action::Update)?;
        let now = Utc::now();

        let book = self
            .repository
            .books
            .update(id, |book| book.apply(name, payload, now))
            .await
            .ok_or_else(|| {
                AppError::NotFound(format!("{}. Id tidak ditemukan", Action::Update.prefix()))
            })?;

        tracing::info!("Book updated: id={}", book.id);
        Ok(book)
    }

    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let removed = self
            .repository
            .books
            .delete(id)
            .await
            .ok_or_else(|| AppError::NotFound("Buku gagal dihapus. Id tidak ditemukan".to_string()))?;

        tracing::info!("Book deleted: id={}", removed.id);
        Ok(())
    }

    pub async fn count(&self) -> usize {
        self.repository.books.count().await
    }
}

/// The two payload checks shared by create and update. Returns the name.
fn validate(payload: &BookPayload, action: Action) -> AppResult<String> {
    let name = match payload.name.as_deref() {
        Some(name) if !name.trim().is_empty() => name.to_string(),
        _ => {
            tracing::warn!("{}: missing name", action.prefix());
            return Err(AppError::Validation(format!(
                "{}. Mohon isi nama buku",
                action.prefix()
            )));
        }
    };

    if payload.read_page > payload.page_count {
        tracing::warn!(
            "{}: readPage {} exceeds pageCount {}",
            action.prefix(),
            payload.read_page,
            payload.page_count
        );
        return Err(AppError::Validation(format!(
            "{}. readPage tidak boleh lebih besar dari pageCount",
            action.prefix()
        )));
    }

    Ok(name)
}

fn generate_id() -> String {
    let mut rng = rand::thread_rng();
    (0..ID_LENGTH)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}
