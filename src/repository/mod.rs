//! Repository layer holding the in-memory book list

pub mod books;

/// Main repository struct holding every store
#[derive(Clone, Default)]
pub struct Repository {
    pub books: books::BooksRepository,
}

impl Repository {
    /// Create a repository with an empty shelf
    pub fn new() -> Self {
        Self {
            books: books::BooksRepository::new(),
        }
    }
}
