//! Persistence gateway for shows and genres.
//!
//! Reads go straight to the store. Writes are staged on a [`ChangeSet`] and
//! applied by [`ShowStore::commit`] as a single transaction in two phases:
//! staged genres are created first, then show rows and their genre
//! associations are written.

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;

use crate::data::models::{Genre, Show};

/// Staged writes awaiting a single commit.
#[derive(Debug, Default)]
pub struct ChangeSet {
    inserts: Vec<Show>,
    updates: Vec<Show>,
    deletes: Vec<i32>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a new show for insertion.
    pub fn add(&mut self, show: Show) {
        self.inserts.push(show);
    }

    /// Stage an overwrite of an existing show, including its genre set.
    pub fn update(&mut self, show: Show) {
        self.updates.push(show);
    }

    /// Stage removal of a show. Its genre associations go with it.
    pub fn delete(&mut self, id: i32) {
        self.deletes.push(id);
    }

    pub fn inserts(&self) -> &[Show] {
        &self.inserts
    }

    pub fn updates(&self) -> &[Show] {
        &self.updates
    }

    pub fn deletes(&self) -> &[i32] {
        &self.deletes
    }

    /// Whether an insert with this id is already staged.
    pub fn contains_insert(&self, id: i32) -> bool {
        self.inserts.iter().any(|s| s.id == id)
    }

    pub fn len(&self) -> usize {
        self.inserts.len() + self.updates.len() + self.deletes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of staged (not yet persisted) genres referenced by inserts and
    /// updates, deduplicated in first-seen order.
    pub fn staged_genre_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for genre in self
            .inserts
            .iter()
            .chain(self.updates.iter())
            .flat_map(|s| s.genres.iter())
            .filter(|g| g.is_staged())
        {
            if !names.iter().any(|n| n == genre.name()) {
                names.push(genre.name().to_owned());
            }
        }
        names
    }
}

/// Outcome of a successful commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitSummary {
    /// Genres created by this commit, with their assigned ids.
    pub created_genres: Vec<Genre>,
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
}

#[async_trait]
pub trait ShowStore: Send + Sync {
    async fn get_by_id(&self, id: i32) -> Result<Option<Show>>;

    /// Which of `ids` are already stored. Does not load genres.
    async fn existing_ids(&self, ids: &[i32]) -> Result<HashSet<i32>>;

    /// The show with the highest id, if any exist.
    async fn get_last(&self) -> Result<Option<Show>>;

    /// A show matching `id`, or matching both `name` and `language`.
    ///
    /// A `None` language only matches shows without a language.
    async fn find_by_id_or_name_and_language(
        &self,
        id: i32,
        name: &str,
        language: Option<&str>,
    ) -> Result<Option<Show>>;

    /// Shows ordered by id ascending.
    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Show>>;

    async fn list_all_genres(&self) -> Result<Vec<Genre>>;

    /// Apply all staged changes atomically. On error nothing is persisted.
    async fn commit(&self, changes: ChangeSet) -> Result<CommitSummary>;
}
