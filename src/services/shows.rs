//! Single-record show operations backing the CRUD endpoints.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::data::models::{Show, ShowRecord};
use crate::data::{ChangeSet, ShowStore};
use crate::ingest::GenreCache;

#[derive(Debug, thiserror::Error)]
pub enum ShowServiceError {
    #[error("Show with ID {0} not found.")]
    NotFound(i32),
    #[error("Show already exists: ID {id}, Name '{name}', Language '{language}'")]
    Conflict {
        id: i32,
        name: String,
        language: String,
    },
    #[error(transparent)]
    Persistence(#[from] anyhow::Error),
}

#[derive(Clone)]
pub struct ShowService {
    store: Arc<dyn ShowStore>,
}

impl ShowService {
    pub fn new(store: Arc<dyn ShowStore>) -> Self {
        Self { store }
    }

    /// Insert a new show.
    ///
    /// Rejected with `Conflict` when a stored show has the same id, or the same
    /// name and language.
    #[instrument(skip_all, fields(show_id = record.id))]
    pub async fn add(&self, record: ShowRecord) -> Result<(), ShowServiceError> {
        let existing = self
            .store
            .find_by_id_or_name_and_language(record.id, &record.name, record.language.as_deref())
            .await?;
        if let Some(existing) = existing {
            warn!(
                existing_id = existing.id,
                name = record.name.as_str(),
                language = ?record.language,
                "Show already exists"
            );
            return Err(ShowServiceError::Conflict {
                id: record.id,
                name: record.name,
                language: record.language.unwrap_or_default(),
            });
        }

        let mut cache = GenreCache::load(self.store.as_ref()).await?;
        let genres = cache.resolve_all(record.genres.as_slice());
        let show = Show::from_record(record, genres);

        let mut changes = ChangeSet::new();
        changes.add(show);
        let summary = self.store.commit(changes).await?;

        info!(
            genres_created = summary.created_genres.len(),
            "Show added"
        );
        Ok(())
    }

    /// Overwrite every mutable field of show `id` and replace its genre set.
    #[instrument(skip(self, record))]
    pub async fn update(&self, id: i32, record: ShowRecord) -> Result<(), ShowServiceError> {
        if self.store.get_by_id(id).await?.is_none() {
            warn!("Show not found for update");
            return Err(ShowServiceError::NotFound(id));
        }

        let mut cache = GenreCache::load(self.store.as_ref()).await?;
        let genres = cache.resolve_all(record.genres.as_slice());
        let show = Show::from_record(ShowRecord { id, ..record }, genres);

        let mut changes = ChangeSet::new();
        changes.update(show);
        self.store.commit(changes).await?;

        info!("Show updated");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ShowServiceError> {
        if self.store.get_by_id(id).await?.is_none() {
            warn!("Show not found for delete");
            return Err(ShowServiceError::NotFound(id));
        }

        let mut changes = ChangeSet::new();
        changes.delete(id);
        self.store.commit(changes).await?;

        info!("Show deleted");
        Ok(())
    }

    pub async fn get(&self, id: i32) -> Result<ShowRecord, ShowServiceError> {
        self.store
            .get_by_id(id)
            .await?
            .map(ShowRecord::from)
            .ok_or(ShowServiceError::NotFound(id))
    }

    pub async fn list(&self, offset: i64, limit: i64) -> Result<Vec<ShowRecord>, ShowServiceError> {
        let shows = self.store.list(offset, limit).await?;
        Ok(shows.into_iter().map(ShowRecord::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MemoryShowStore;
    use crate::data::models::GenreRef;
    use chrono::NaiveDate;

    fn record(id: i32, name: &str, language: Option<&str>, genres: &[&str]) -> ShowRecord {
        ShowRecord {
            id,
            name: name.into(),
            language: language.map(String::from),
            premiered: NaiveDate::from_ymd_opt(2016, 4, 1),
            summary: Some("<p>Summary</p>".into()),
            genres: genres.iter().map(|g| g.to_string()).collect(),
        }
    }

    fn stored(id: i32, name: &str, language: Option<&str>) -> Show {
        Show::from_record(record(id, name, language, &[]), Vec::new())
    }

    fn service() -> (Arc<MemoryShowStore>, ShowService) {
        let store = Arc::new(MemoryShowStore::new());
        let service = ShowService::new(store.clone());
        (store, service)
    }

    #[tokio::test]
    async fn test_add_conflicts_on_name_and_language() {
        let (store, service) = service();
        store.seed(stored(1, "X", Some("en")));

        let err = service
            .add(record(5, "X", Some("en"), &[]))
            .await
            .unwrap_err();

        assert!(matches!(err, ShowServiceError::Conflict { id: 5, .. }));
        assert_eq!(store.commit_count(), 0);
        assert_eq!(store.show_ids(), vec![1]);
    }

    #[tokio::test]
    async fn test_add_conflicts_on_same_id() {
        let (store, service) = service();
        store.seed(stored(5, "Other", Some("fr")));

        let err = service
            .add(record(5, "X", Some("en"), &[]))
            .await
            .unwrap_err();

        assert!(matches!(err, ShowServiceError::Conflict { .. }));
        assert_eq!(
            err.to_string(),
            "Show already exists: ID 5, Name 'X', Language 'en'"
        );
    }

    #[tokio::test]
    async fn test_add_reuses_existing_genres() {
        let (store, service) = service();
        store.seed_genre("Drama");

        service
            .add(record(9, "New", None, &["Drama", "Sci-Fi", "Sci-Fi"]))
            .await
            .unwrap();

        assert_eq!(store.genre_names(), vec!["Drama", "Sci-Fi"]);
        let show = service.get(9).await.unwrap();
        assert_eq!(show.genres, vec!["Drama", "Sci-Fi"]);
    }

    #[tokio::test]
    async fn test_update_missing_show_is_not_found() {
        let (store, service) = service();

        let err = service
            .update(42, record(42, "Y", None, &[]))
            .await
            .unwrap_err();

        assert!(matches!(err, ShowServiceError::NotFound(42)));
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn test_update_replaces_fields_and_genres() {
        let (store, service) = service();
        let mut existing = stored(3, "Old", Some("en"));
        existing.genres = vec![GenreRef::Staged("Drama".into())];
        store.seed(existing);

        // The body id is ignored in favor of the path id.
        service
            .update(3, record(999, "New", Some("de"), &["Horror"]))
            .await
            .unwrap();

        let show = service.get(3).await.unwrap();
        assert_eq!(show.name, "New");
        assert_eq!(show.language.as_deref(), Some("de"));
        assert_eq!(show.genres, vec!["Horror"]);
        assert_eq!(store.show_ids(), vec![3]);
    }

    #[tokio::test]
    async fn test_delete_removes_show() {
        let (store, service) = service();
        store.seed(stored(8, "Gone", None));

        service.delete(8).await.unwrap();
        assert!(store.show_ids().is_empty());

        let err = service.delete(8).await.unwrap_err();
        assert!(matches!(err, ShowServiceError::NotFound(8)));
    }
}
