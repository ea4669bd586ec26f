//! Postgres store behavior. Needs `DATABASE_URL` pointing at a server where
//! `sqlx::test` may create throwaway databases.

use chrono::NaiveDate;
use showsync::data::models::{GenreRef, Show};
use showsync::data::{ChangeSet, PgShowStore, ShowStore};
use sqlx::PgPool;

fn show(id: i32, name: &str, language: Option<&str>, genres: &[&str]) -> Show {
    Show {
        id,
        name: name.to_owned(),
        language: language.map(String::from),
        premiered: NaiveDate::from_ymd_opt(2016, 3, 1),
        summary: None,
        genres: genres
            .iter()
            .map(|g| GenreRef::Staged((*g).to_owned()))
            .collect(),
    }
}

async fn insert(store: &PgShowStore, shows: Vec<Show>) {
    let mut changes = ChangeSet::new();
    for s in shows {
        changes.add(s);
    }
    store.commit(changes).await.expect("insert commit failed");
}

#[ignore = "requires DATABASE_URL"]
#[sqlx::test]
async fn commit_creates_staged_genres_and_links(pool: PgPool) {
    let store = PgShowStore::new(pool);

    let mut changes = ChangeSet::new();
    changes.add(show(1, "Alpha", Some("English"), &["Drama", "Crime"]));
    changes.add(show(2, "Beta", Some("English"), &["Drama"]));
    let summary = store.commit(changes).await.unwrap();

    assert_eq!(summary.inserted, 2);
    assert_eq!(summary.created_genres.len(), 2);

    let beta = store.get_by_id(2).await.unwrap().unwrap();
    assert_eq!(beta.genre_names(), vec!["Drama"]);
    assert!(!beta.genres[0].is_staged());

    let last = store.get_last().await.unwrap().unwrap();
    assert_eq!(last.id, 2);
}

#[ignore = "requires DATABASE_URL"]
#[sqlx::test]
async fn composite_lookup_matches_null_language(pool: PgPool) {
    let store = PgShowStore::new(pool);
    insert(&store, vec![show(10, "Silent", None, &[])]).await;

    let found = store
        .find_by_id_or_name_and_language(99, "Silent", None)
        .await
        .unwrap();
    assert_eq!(found.map(|s| s.id), Some(10));

    let other_language = store
        .find_by_id_or_name_and_language(99, "Silent", Some("French"))
        .await
        .unwrap();
    assert!(other_language.is_none());
}

#[ignore = "requires DATABASE_URL"]
#[sqlx::test]
async fn update_replaces_genre_set(pool: PgPool) {
    let store = PgShowStore::new(pool);
    insert(&store, vec![show(3, "Gamma", Some("English"), &["Drama", "Comedy"])]).await;

    let mut changes = ChangeSet::new();
    changes.update(show(3, "Gamma II", Some("English"), &["Horror"]));
    let summary = store.commit(changes).await.unwrap();
    assert_eq!(summary.updated, 1);

    let gamma = store.get_by_id(3).await.unwrap().unwrap();
    assert_eq!(gamma.name, "Gamma II");
    assert_eq!(gamma.genre_names(), vec!["Horror"]);
}

#[ignore = "requires DATABASE_URL"]
#[sqlx::test]
async fn failed_commit_rolls_back_genres(pool: PgPool) {
    let store = PgShowStore::new(pool);
    insert(&store, vec![show(4, "Delta", Some("English"), &[])]).await;

    let mut changes = ChangeSet::new();
    changes.add(show(5, "Epsilon", Some("English"), &["Western"]));
    changes.add(show(4, "Delta again", Some("English"), &[]));
    assert!(store.commit(changes).await.is_err());

    assert!(store.get_by_id(5).await.unwrap().is_none());
    assert!(store.list_all_genres().await.unwrap().is_empty());
}

#[ignore = "requires DATABASE_URL"]
#[sqlx::test]
async fn existing_ids_checks_a_whole_batch(pool: PgPool) {
    let store = PgShowStore::new(pool);
    insert(&store, vec![show(20, "Zeta", None, &["Drama"]), show(21, "Eta", None, &[])]).await;

    let found = store.existing_ids(&[19, 20, 21, 22]).await.unwrap();
    assert_eq!(found, std::collections::HashSet::from([20, 21]));
}
