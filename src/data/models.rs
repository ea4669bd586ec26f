//! Show and genre models shared by the catalog client, the store and the web layer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A persisted genre row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::FromRow)]
pub struct Genre {
    pub id: i32,
    pub name: String,
}

/// A genre attached to a show: either already persisted or staged for creation
/// when the owning show is committed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GenreRef {
    Stored(Genre),
    Staged(String),
}

impl GenreRef {
    pub fn name(&self) -> &str {
        match self {
            GenreRef::Stored(genre) => &genre.name,
            GenreRef::Staged(name) => name,
        }
    }

    pub fn is_staged(&self) -> bool {
        matches!(self, GenreRef::Staged(_))
    }
}

/// A show as held by the store. The id is assigned by the external catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Show {
    pub id: i32,
    pub name: String,
    pub language: Option<String>,
    pub premiered: Option<NaiveDate>,
    pub summary: Option<String>,
    pub genres: Vec<GenreRef>,
}

impl Show {
    /// Build a show from a wire record, with genres already resolved by the caller.
    pub fn from_record(record: ShowRecord, genres: Vec<GenreRef>) -> Self {
        Self {
            id: record.id,
            name: record.name,
            language: record.language,
            premiered: record.premiered,
            summary: record.summary,
            genres,
        }
    }

    pub fn genre_names(&self) -> Vec<&str> {
        self.genres.iter().map(GenreRef::name).collect()
    }
}

/// Wire shape of a show: one entry of a catalog page, the body of add/update
/// requests, and the body of show responses.
///
/// Unknown fields are ignored so full catalog payloads decode directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowRecord {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub premiered: Option<NaiveDate>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
}

impl From<Show> for ShowRecord {
    fn from(show: Show) -> Self {
        let genres = show.genres.iter().map(|g| g.name().to_owned()).collect();
        Self {
            id: show.id,
            name: show.name,
            language: show.language,
            premiered: show.premiered,
            summary: show.summary,
            genres,
        }
    }
}

/// Body of `PUT /api/shows/{id}`. The id comes from the path, so any `id`
/// in the body is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ShowUpdate {
    pub name: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub premiered: Option<NaiveDate>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
}

impl ShowUpdate {
    pub fn into_record(self, id: i32) -> ShowRecord {
        ShowRecord {
            id,
            name: self.name,
            language: self.language,
            premiered: self.premiered,
            summary: self.summary,
            genres: self.genres,
        }
    }
}
