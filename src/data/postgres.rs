//! Postgres-backed [`ShowStore`].
//!
//! Bulk writes use the UNNEST pattern so a whole flush is a handful of
//! statements regardless of batch size.

use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, Transaction};

use crate::data::models::{Genre, GenreRef, Show};
use crate::data::store::{ChangeSet, CommitSummary, ShowStore};

#[derive(Debug, sqlx::FromRow)]
struct ShowRow {
    id: i32,
    name: String,
    language: Option<String>,
    premiered: Option<NaiveDate>,
    summary: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct ShowGenreRow {
    show_id: i32,
    genre_id: i32,
    name: String,
}

#[derive(Debug, Clone)]
pub struct PgShowStore {
    pool: PgPool,
}

impl PgShowStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attach genres to a set of show rows with one query.
    async fn hydrate(&self, rows: Vec<ShowRow>) -> Result<Vec<Show>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
        let links = sqlx::query_as::<_, ShowGenreRow>(
            r#"
            SELECT sg.show_id, g.id AS genre_id, g.name
            FROM show_genres sg
            JOIN genres g ON g.id = sg.genre_id
            WHERE sg.show_id = ANY($1)
            ORDER BY sg.show_id, g.id
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .context("failed to fetch show genres")?;

        let mut by_show: HashMap<i32, Vec<GenreRef>> = HashMap::new();
        for link in links {
            by_show
                .entry(link.show_id)
                .or_default()
                .push(GenreRef::Stored(Genre {
                    id: link.genre_id,
                    name: link.name,
                }));
        }

        Ok(rows
            .into_iter()
            .map(|row| Show {
                genres: by_show.remove(&row.id).unwrap_or_default(),
                id: row.id,
                name: row.name,
                language: row.language,
                premiered: row.premiered,
                summary: row.summary,
            })
            .collect())
    }

    async fn hydrate_one(&self, row: Option<ShowRow>) -> Result<Option<Show>> {
        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

/// Phase one: make sure every staged genre has a row. Returns the genres this
/// transaction created and the id of every staged name.
async fn create_staged_genres(
    tx: &mut Transaction<'_, Postgres>,
    names: &[String],
) -> Result<(Vec<Genre>, HashMap<String, i32>)> {
    if names.is_empty() {
        return Ok((Vec::new(), HashMap::new()));
    }

    let created = sqlx::query_as::<_, Genre>(
        r#"
        INSERT INTO genres (name)
        SELECT * FROM UNNEST($1::text[])
        ON CONFLICT (name) DO NOTHING
        RETURNING id, name
        "#,
    )
    .bind(names)
    .fetch_all(&mut **tx)
    .await
    .context("failed to insert staged genres")?;

    let all = sqlx::query_as::<_, Genre>("SELECT id, name FROM genres WHERE name = ANY($1)")
        .bind(names)
        .fetch_all(&mut **tx)
        .await
        .context("failed to resolve staged genre ids")?;

    let ids = all.into_iter().map(|g| (g.name, g.id)).collect();
    Ok((created, ids))
}

/// Resolve every genre of `show` to a stored id.
fn genre_ids_for(show: &Show, staged_ids: &HashMap<String, i32>) -> Result<Vec<i32>> {
    let mut ids = Vec::with_capacity(show.genres.len());
    for genre in &show.genres {
        let id = match genre {
            GenreRef::Stored(g) => g.id,
            GenreRef::Staged(name) => match staged_ids.get(name) {
                Some(id) => *id,
                None => bail!("staged genre '{name}' was not created"),
            },
        };
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// Phase two, bulk part: insert show rows.
async fn insert_shows(tx: &mut Transaction<'_, Postgres>, shows: &[Show]) -> Result<()> {
    if shows.is_empty() {
        return Ok(());
    }

    let ids: Vec<i32> = shows.iter().map(|s| s.id).collect();
    let names: Vec<&str> = shows.iter().map(|s| s.name.as_str()).collect();
    let languages: Vec<Option<&str>> = shows.iter().map(|s| s.language.as_deref()).collect();
    let premiered: Vec<Option<NaiveDate>> = shows.iter().map(|s| s.premiered).collect();
    let summaries: Vec<Option<&str>> = shows.iter().map(|s| s.summary.as_deref()).collect();

    sqlx::query(
        r#"
        INSERT INTO shows (id, name, language, premiered, summary)
        SELECT * FROM UNNEST($1::int4[], $2::text[], $3::text[], $4::date[], $5::text[])
        "#,
    )
    .bind(&ids)
    .bind(&names)
    .bind(&languages)
    .bind(&premiered)
    .bind(&summaries)
    .execute(&mut **tx)
    .await
    .context("failed to insert shows")?;

    Ok(())
}

async fn link_genres(tx: &mut Transaction<'_, Postgres>, links: &[(i32, i32)]) -> Result<()> {
    if links.is_empty() {
        return Ok(());
    }

    let show_ids: Vec<i32> = links.iter().map(|(s, _)| *s).collect();
    let genre_ids: Vec<i32> = links.iter().map(|(_, g)| *g).collect();

    sqlx::query(
        r#"
        INSERT INTO show_genres (show_id, genre_id)
        SELECT * FROM UNNEST($1::int4[], $2::int4[])
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(&show_ids)
    .bind(&genre_ids)
    .execute(&mut **tx)
    .await
    .context("failed to link show genres")?;

    Ok(())
}

#[async_trait]
impl ShowStore for PgShowStore {
    async fn get_by_id(&self, id: i32) -> Result<Option<Show>> {
        let row = sqlx::query_as::<_, ShowRow>(
            "SELECT id, name, language, premiered, summary FROM shows WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch show by id")?;
        self.hydrate_one(row).await
    }

    async fn existing_ids(&self, ids: &[i32]) -> Result<HashSet<i32>> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }
        let found: Vec<i32> = sqlx::query_scalar("SELECT id FROM shows WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .context("failed to check existing show ids")?;
        Ok(found.into_iter().collect())
    }

    async fn get_last(&self) -> Result<Option<Show>> {
        let row = sqlx::query_as::<_, ShowRow>(
            "SELECT id, name, language, premiered, summary FROM shows ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch last show")?;
        self.hydrate_one(row).await
    }

    async fn find_by_id_or_name_and_language(
        &self,
        id: i32,
        name: &str,
        language: Option<&str>,
    ) -> Result<Option<Show>> {
        let row = sqlx::query_as::<_, ShowRow>(
            r#"
            SELECT id, name, language, premiered, summary
            FROM shows
            WHERE id = $1 OR (name = $2 AND language IS NOT DISTINCT FROM $3)
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(language)
        .fetch_optional(&self.pool)
        .await
        .context("failed to look up show by id or name/language")?;
        self.hydrate_one(row).await
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Show>> {
        let rows = sqlx::query_as::<_, ShowRow>(
            r#"
            SELECT id, name, language, premiered, summary
            FROM shows
            ORDER BY id
            OFFSET $1 LIMIT $2
            "#,
        )
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("failed to list shows")?;
        self.hydrate(rows).await
    }

    async fn list_all_genres(&self) -> Result<Vec<Genre>> {
        sqlx::query_as::<_, Genre>("SELECT id, name FROM genres ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .context("failed to fetch all genres")
    }

    async fn commit(&self, changes: ChangeSet) -> Result<CommitSummary> {
        let mut tx = self.pool.begin().await.context("failed to begin commit")?;

        let (created_genres, staged_ids) =
            create_staged_genres(&mut tx, &changes.staged_genre_names()).await?;

        let mut summary = CommitSummary {
            created_genres,
            ..CommitSummary::default()
        };

        if !changes.deletes().is_empty() {
            let result = sqlx::query("DELETE FROM shows WHERE id = ANY($1)")
                .bind(changes.deletes())
                .execute(&mut *tx)
                .await
                .context("failed to delete shows")?;
            summary.deleted = result.rows_affected() as usize;
        }

        insert_shows(&mut tx, changes.inserts()).await?;
        summary.inserted = changes.inserts().len();

        for show in changes.updates() {
            let result = sqlx::query(
                r#"
                UPDATE shows
                SET name = $2, language = $3, premiered = $4, summary = $5
                WHERE id = $1
                "#,
            )
            .bind(show.id)
            .bind(&show.name)
            .bind(show.language.as_deref())
            .bind(show.premiered)
            .bind(show.summary.as_deref())
            .execute(&mut *tx)
            .await
            .context("failed to update show")?;

            if result.rows_affected() == 0 {
                bail!("show {} not found for update", show.id);
            }

            sqlx::query("DELETE FROM show_genres WHERE show_id = $1")
                .bind(show.id)
                .execute(&mut *tx)
                .await
                .context("failed to clear show genres")?;
            summary.updated += 1;
        }

        let mut links = Vec::new();
        for show in changes.inserts().iter().chain(changes.updates()) {
            for genre_id in genre_ids_for(show, &staged_ids)? {
                links.push((show.id, genre_id));
            }
        }
        link_genres(&mut tx, &links).await?;

        tx.commit().await.context("failed to commit transaction")?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genre_ids_for_resolves_staged_names_and_dedups() {
        let show = Show {
            id: 1,
            name: "A".into(),
            language: None,
            premiered: None,
            summary: None,
            genres: vec![
                GenreRef::Stored(Genre {
                    id: 4,
                    name: "Drama".into(),
                }),
                GenreRef::Staged("Anime".into()),
                GenreRef::Staged("Anime".into()),
            ],
        };
        let staged = HashMap::from([("Anime".to_string(), 9)]);

        assert_eq!(genre_ids_for(&show, &staged).unwrap(), vec![4, 9]);
    }

    #[test]
    fn test_genre_ids_for_rejects_unknown_staged_name() {
        let show = Show {
            id: 1,
            name: "A".into(),
            language: None,
            premiered: None,
            summary: None,
            genres: vec![GenreRef::Staged("Western".into())],
        };

        assert!(genre_ids_for(&show, &HashMap::new()).is_err());
    }
}
