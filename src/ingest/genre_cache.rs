//! Per-run genre lookup that keeps new genre names from being created twice.

use std::collections::HashMap;

use anyhow::Result;

use crate::data::ShowStore;
use crate::data::models::{Genre, GenreRef};

/// Mapping from genre name to its stored or staged identity.
///
/// Built once per ingestion run (or mutation) from the full genre table and
/// owned by that run. Names are matched case-sensitively.
#[derive(Debug, Default)]
pub struct GenreCache {
    by_name: HashMap<String, GenreRef>,
}

impl GenreCache {
    pub fn from_genres(genres: Vec<Genre>) -> Self {
        let by_name = genres
            .into_iter()
            .map(|g| (g.name.clone(), GenreRef::Stored(g)))
            .collect();
        Self { by_name }
    }

    /// Load every stored genre.
    pub async fn load(store: &dyn ShowStore) -> Result<Self> {
        Ok(Self::from_genres(store.list_all_genres().await?))
    }

    /// Return the known entry for `name`, or stage a new one. A staged entry is
    /// reused by every later occurrence of the same name.
    pub fn resolve_or_stage(&mut self, name: &str) -> GenreRef {
        if let Some(existing) = self.by_name.get(name) {
            return existing.clone();
        }
        let staged = GenreRef::Staged(name.to_owned());
        self.by_name.insert(name.to_owned(), staged.clone());
        staged
    }

    /// Resolve a list of names, dropping repeats within the list.
    pub fn resolve_all<S: AsRef<str>>(&mut self, names: &[S]) -> Vec<GenreRef> {
        let mut refs: Vec<GenreRef> = Vec::with_capacity(names.len());
        for name in names {
            let genre = self.resolve_or_stage(name.as_ref());
            if !refs.contains(&genre) {
                refs.push(genre);
            }
        }
        refs
    }

    /// Promote staged entries to stored ones after a commit created them.
    pub fn absorb(&mut self, created: &[Genre]) {
        for genre in created {
            self.by_name
                .insert(genre.name.clone(), GenreRef::Stored(genre.clone()));
        }
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
