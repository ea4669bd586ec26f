//! In-memory [`ShowStore`] used by tests and local runs without Postgres.
//!
//! Commits are applied to a copy of the state and swapped in only on success,
//! so a failed commit leaves nothing behind, matching a rolled-back transaction.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Result, bail};
use async_trait::async_trait;

use crate::data::models::{Genre, GenreRef, Show};
use crate::data::store::{ChangeSet, CommitSummary, ShowStore};

#[derive(Debug, Clone)]
struct StoredShow {
    show: Show,
    genre_ids: Vec<i32>,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    shows: BTreeMap<i32, StoredShow>,
    genres: BTreeMap<i32, String>,
    next_genre_id: i32,
}

impl MemoryState {
    fn genre_id(&self, name: &str) -> Option<i32> {
        self.genres
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(id, _)| *id)
    }

    fn create_genre(&mut self, name: &str) -> Genre {
        self.next_genre_id += 1;
        let id = self.next_genre_id;
        self.genres.insert(id, name.to_owned());
        Genre {
            id,
            name: name.to_owned(),
        }
    }

    fn hydrate(&self, stored: &StoredShow) -> Show {
        let mut show = stored.show.clone();
        show.genres = stored
            .genre_ids
            .iter()
            .filter_map(|id| {
                self.genres.get(id).map(|name| {
                    GenreRef::Stored(Genre {
                        id: *id,
                        name: name.clone(),
                    })
                })
            })
            .collect();
        show
    }

    fn resolve_genre_ids(&self, show: &Show) -> Result<Vec<i32>> {
        let mut ids = Vec::with_capacity(show.genres.len());
        for genre in &show.genres {
            let id = match genre {
                GenreRef::Stored(g) if self.genres.contains_key(&g.id) => g.id,
                other => match self.genre_id(other.name()) {
                    Some(id) => id,
                    None => bail!("genre '{}' has no stored row", other.name()),
                },
            };
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }
}

#[derive(Debug, Default)]
pub struct MemoryShowStore {
    state: Mutex<MemoryState>,
    commits: Mutex<usize>,
    fail_commits: Mutex<bool>,
}

impl MemoryShowStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a show directly, creating any genres it names.
    pub fn seed(&self, show: Show) {
        let mut state = self.state();
        let mut genre_ids = Vec::new();
        for genre in &show.genres {
            let id = match state.genre_id(genre.name()) {
                Some(id) => id,
                None => state.create_genre(genre.name()).id,
            };
            genre_ids.push(id);
        }
        state.shows.insert(show.id, StoredShow { show, genre_ids });
    }

    /// Create a genre row directly.
    pub fn seed_genre(&self, name: &str) -> Genre {
        self.state().create_genre(name)
    }

    /// Number of successful commits so far.
    pub fn commit_count(&self) -> usize {
        *self.commits.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every subsequent commit fail until reset.
    pub fn set_fail_commits(&self, fail: bool) {
        *self.fail_commits.lock().unwrap_or_else(PoisonError::into_inner) = fail;
    }

    pub fn show_ids(&self) -> Vec<i32> {
        self.state().shows.keys().copied().collect()
    }

    pub fn genre_names(&self) -> Vec<String> {
        self.state().genres.values().cloned().collect()
    }
}

#[async_trait]
impl ShowStore for MemoryShowStore {
    async fn get_by_id(&self, id: i32) -> Result<Option<Show>> {
        let state = self.state();
        Ok(state.shows.get(&id).map(|s| state.hydrate(s)))
    }

    async fn existing_ids(&self, ids: &[i32]) -> Result<HashSet<i32>> {
        let state = self.state();
        Ok(ids
            .iter()
            .copied()
            .filter(|id| state.shows.contains_key(id))
            .collect())
    }

    async fn get_last(&self) -> Result<Option<Show>> {
        let state = self.state();
        Ok(state.shows.values().next_back().map(|s| state.hydrate(s)))
    }

    async fn find_by_id_or_name_and_language(
        &self,
        id: i32,
        name: &str,
        language: Option<&str>,
    ) -> Result<Option<Show>> {
        let state = self.state();
        Ok(state
            .shows
            .values()
            .find(|s| {
                s.show.id == id || (s.show.name == name && s.show.language.as_deref() == language)
            })
            .map(|s| state.hydrate(s)))
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Show>> {
        let state = self.state();
        Ok(state
            .shows
            .values()
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .map(|s| state.hydrate(s))
            .collect())
    }

    async fn list_all_genres(&self) -> Result<Vec<Genre>> {
        Ok(self
            .state()
            .genres
            .iter()
            .map(|(id, name)| Genre {
                id: *id,
                name: name.clone(),
            })
            .collect())
    }

    async fn commit(&self, changes: ChangeSet) -> Result<CommitSummary> {
        if *self.fail_commits.lock().unwrap_or_else(PoisonError::into_inner) {
            bail!("simulated commit failure");
        }

        let mut guard = self.state();
        let mut next = guard.clone();
        let mut summary = CommitSummary::default();

        for name in changes.staged_genre_names() {
            if next.genre_id(&name).is_none() {
                summary.created_genres.push(next.create_genre(&name));
            }
        }

        for id in changes.deletes() {
            if next.shows.remove(id).is_none() {
                bail!("show {id} not found for delete");
            }
            summary.deleted += 1;
        }

        for show in changes.inserts() {
            if next.shows.contains_key(&show.id) {
                bail!("duplicate key: show {} already exists", show.id);
            }
            let genre_ids = next.resolve_genre_ids(show)?;
            next.shows.insert(
                show.id,
                StoredShow {
                    show: show.clone(),
                    genre_ids,
                },
            );
            summary.inserted += 1;
        }

        for show in changes.updates() {
            if !next.shows.contains_key(&show.id) {
                bail!("show {} not found for update", show.id);
            }
            let genre_ids = next.resolve_genre_ids(show)?;
            next.shows.insert(
                show.id,
                StoredShow {
                    show: show.clone(),
                    genre_ids,
                },
            );
            summary.updated += 1;
        }

        *guard = next;
        *self.commits.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(summary)
    }
}
