//! Book record model and related request/response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// A book on the shelf
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub name: String,
    pub year: Option<i32>,
    pub author: Option<String>,
    pub summary: Option<String>,
    pub publisher: Option<String>,
    pub page_count: u32,
    pub read_page: u32,
    /// Always `read_page == page_count`
    pub finished: bool,
    pub reading: bool,
    #[serde(with = "iso_millis")]
    #[schema(value_type = String, format = DateTime)]
    pub inserted_at: DateTime<Utc>,
    #[serde(with = "iso_millis")]
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Build a new record from a validated payload.
    pub fn new(id: String, name: String, payload: BookPayload, now: DateTime<Utc>) -> Self {
        let mut book = Self {
            id,
            name: String::new(),
            year: None,
            author: None,
            summary: None,
            publisher: None,
            page_count: 0,
            read_page: 0,
            finished: false,
            reading: false,
            inserted_at: now,
            updated_at: now,
        };
        book.apply(name, payload, now);
        book
    }

    /// Overwrite every client-editable field and refresh the derived ones.
    /// `id` and `inserted_at` are left untouched.
    pub fn apply(&mut self, name: String, payload: BookPayload, now: DateTime<Utc>) {
        self.name = name;
        self.year = payload.year;
        self.author = payload.author;
        self.summary = payload.summary;
        self.publisher = payload.publisher;
        self.page_count = payload.page_count;
        self.read_page = payload.read_page;
        self.reading = payload.reading;
        self.finished = self.read_page == self.page_count;
        self.updated_at = now;
    }
}

/// Projection returned by the list endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BookShort {
    pub id: String,
    pub name: String,
    pub publisher: Option<String>,
}

impl From<&Book> for BookShort {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id.clone(),
            name: book.name.clone(),
            publisher: book.publisher.clone(),
        }
    }
}

/// Create / update request body
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookPayload {
    /// Required; rejected when missing or blank
    pub name: Option<String>,
    pub year: Option<i32>,
    pub author: Option<String>,
    pub summary: Option<String>,
    pub publisher: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub page_count: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub read_page: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reading: bool,
}

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// List filters
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Case-insensitive substring of the book name
    pub name: Option<String>,
    /// `1` for books being read, `0` for the others
    pub reading: Option<String>,
    /// `1` for finished books, `0` for the others
    pub finished: Option<String>,
}

impl BookQuery {
    pub fn reading_flag(&self) -> Option<bool> {
        self.reading.as_deref().and_then(parse_flag)
    }

    pub fn finished_flag(&self) -> Option<bool> {
        self.finished.as_deref().and_then(parse_flag)
    }

    /// Lowercased name needle, `None` when empty
    pub fn name_needle(&self) -> Option<String> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    /// Whether a record passes every filter in this query
    pub fn matches(&self, book: &Book) -> bool {
        if let Some(needle) = self.name_needle() {
            if !book.name.to_lowercase().contains(&needle) {
                return false;
            }
        }
        if let Some(reading) = self.reading_flag() {
            if book.reading != reading {
                return false;
            }
        }
        if let Some(finished) = self.finished_flag() {
            if book.finished != finished {
                return false;
            }
        }
        true
    }
}

/// `"0"` / `"1"` query flags; anything else means "no filter".
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim() {
        "0" => Some(false),
        "1" => Some(true),
        _ => None,
    }
}

/// Timestamps as `2024-01-31T10:15:00.123Z`.
mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
