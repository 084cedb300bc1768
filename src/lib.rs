//! Bookshelf
//!
//! An in-memory book record management server exposing a REST JSON API
//! to create, list, retrieve, update and delete books.

use std::{future::Future, sync::Arc};

use tokio::net::TcpListener;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<services::Services>,
}

impl AppState {
    /// State backed by an empty shelf
    pub fn new() -> Self {
        let repository = repository::Repository::new();
        Self {
            services: Arc::new(services::Services::new(repository)),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Serve the API on `listener` until `shutdown` resolves, then let in-flight
/// requests finish.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
