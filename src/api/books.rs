//! Book endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult, ErrorResponse},
    models::book::{Book, BookPayload, BookQuery, BookShort},
    AppState,
};

use super::{ApiResponse, BookEnvelope, BookListEnvelope, CreatedEnvelope, MessageResponse};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatedBook {
    pub book_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookList {
    pub books: Vec<BookShort>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookDetail {
    pub book: Book,
}

/// Add a book to the shelf
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    request_body = BookPayload,
    responses(
        (status = 201, description = "Book created", body = CreatedEnvelope),
        (status = 400, description = "Missing name or readPage > pageCount", body = ErrorResponse)
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<BookPayload>, AppError>,
) -> AppResult<(StatusCode, Json<ApiResponse<CreatedBook>>)> {
    let book_id = state.services.books.create(payload).await?;
    let body = ApiResponse::new(CreatedBook { book_id }).with_message("Buku berhasil ditambahkan");
    Ok((StatusCode::CREATED, Json(body)))
}

/// List books, optionally filtered
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(BookQuery),
    responses(
        (status = 200, description = "Book summaries in insertion order", body = BookListEnvelope),
        (status = 400, description = "Malformed query string", body = ErrorResponse)
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<BookQuery>, AppError>,
) -> AppResult<Json<ApiResponse<BookList>>> {
    let books = state.services.books.list(&query).await;
    Ok(Json(ApiResponse::new(BookList { books })))
}

/// Get a book by id
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(("id" = String, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book details", body = BookEnvelope),
        (status = 404, description = "Book not found", body = ErrorResponse)
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<BookDetail>>> {
    let book = state.services.books.get_by_id(&id).await?;
    Ok(Json(ApiResponse::new(BookDetail { book })))
}

/// Replace a book's fields
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    params(("id" = String, Path, description = "Book ID")),
    request_body = BookPayload,
    responses(
        (status = 200, description = "Book updated", body = MessageResponse),
        (status = 400, description = "Missing name or readPage > pageCount", body = ErrorResponse),
        (status = 404, description = "Book not found", body = ErrorResponse)
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
    WithRejection(Json(payload), _): WithRejection<Json<BookPayload>, AppError>,
) -> AppResult<Json<MessageResponse>> {
    state.services.books.update(&id, payload).await?;
    Ok(Json(MessageResponse::new("Buku berhasil diperbarui")))
}

/// Remove a book
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    params(("id" = String, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book deleted", body = MessageResponse),
        (status = 404, description = "Book not found", body = ErrorResponse)
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    state.services.books.delete(&id).await?;
    Ok(Json(MessageResponse::new("Buku berhasil dihapus")))
}
