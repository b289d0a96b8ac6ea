use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;

use super::repo_types::{NewPollution, Pollution, PollutionChanges, PollutionFilter, Reporter};

#[async_trait]
pub trait PollutionRepo: Send + Sync {
    async fn list(&self, filter: &PollutionFilter) -> anyhow::Result<Vec<Pollution>>;
    async fn find_with_reporter(
        &self,
        id: i64,
    ) -> anyhow::Result<Option<(Pollution, Option<Reporter>)>>;
    async fn insert(&self, pollution: NewPollution) -> anyhow::Result<Pollution>;
    /// Returns the number of rows touched.
    async fn update(&self, id: i64, changes: PollutionChanges) -> anyhow::Result<u64>;
    /// Returns the number of rows removed.
    async fn delete(&self, id: i64) -> anyhow::Result<u64>;
}

#[derive(Clone)]
pub struct PgPollutionRepo {
    db: PgPool,
}

impl PgPollutionRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const POLLUTION_COLUMNS: &str = "id, title, place, observed_at, pollution_type, description, \
     latitude, longitude, photo_data, photo_mime, user_id, created_at, updated_at";

#[async_trait]
impl PollutionRepo for PgPollutionRepo {
    async fn list(&self, filter: &PollutionFilter) -> anyhow::Result<Vec<Pollution>> {
        let rows = sqlx::query_as::<_, Pollution>(&format!(
            r#"
            SELECT {POLLUTION_COLUMNS}
              FROM pollutions
             WHERE ($1::text IS NULL
                    OR title LIKE '%' || $1 || '%'
                    OR description LIKE '%' || $1 || '%')
               AND ($2::text IS NULL OR pollution_type = $2)
             ORDER BY id
            "#
        ))
        .bind(filter.search.as_deref())
        .bind(filter.pollution_type.as_deref())
        .fetch_all(&self.db)
        .await
        .context("list pollutions")?;
        Ok(rows)
    }

    async fn find_with_reporter(
        &self,
        id: i64,
    ) -> anyhow::Result<Option<(Pollution, Option<Reporter>)>> {
        let pollution = sqlx::query_as::<_, Pollution>(&format!(
            "SELECT {POLLUTION_COLUMNS} FROM pollutions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find pollution by id")?;

        let Some(pollution) = pollution else {
            return Ok(None);
        };

        let reporter = match pollution.user_id {
            Some(user_id) => sqlx::query_as::<_, Reporter>(
                "SELECT id, username, email FROM users WHERE id = $1",
            )
            .bind(user_id)
            .fetch_optional(&self.db)
            .await
            .context("load pollution reporter")?,
            None => None,
        };

        Ok(Some((pollution, reporter)))
    }

    async fn insert(&self, p: NewPollution) -> anyhow::Result<Pollution> {
        let (photo_data, photo_mime) = match p.photo {
            Some(photo) => (Some(photo.data), Some(photo.mime)),
            None => (None, None),
        };
        let created = sqlx::query_as::<_, Pollution>(&format!(
            r#"
            INSERT INTO pollutions
                (title, place, observed_at, pollution_type, description,
                 latitude, longitude, photo_data, photo_mime, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {POLLUTION_COLUMNS}
            "#
        ))
        .bind(&p.title)
        .bind(&p.place)
        .bind(p.observed_at)
        .bind(p.pollution_type.map(|t| t.as_str()))
        .bind(&p.description)
        .bind(p.latitude)
        .bind(p.longitude)
        .bind(photo_data)
        .bind(photo_mime)
        .bind(p.user_id)
        .fetch_one(&self.db)
        .await
        .context("insert pollution")?;
        Ok(created)
    }

    async fn update(&self, id: i64, c: PollutionChanges) -> anyhow::Result<u64> {
        let (photo_data, photo_mime) = match c.photo {
            Some(photo) => (Some(photo.data), Some(photo.mime)),
            None => (None, None),
        };
        let result = sqlx::query(
            r#"
            UPDATE pollutions
               SET title          = $2,
                   place          = COALESCE($3, place),
                   observed_at    = COALESCE($4, observed_at),
                   pollution_type = COALESCE($5, pollution_type),
                   description    = COALESCE($6, description),
                   latitude       = COALESCE($7, latitude),
                   longitude      = COALESCE($8, longitude),
                   photo_data     = COALESCE($9, photo_data),
                   photo_mime     = COALESCE($10, photo_mime),
                   updated_at     = now()
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&c.title)
        .bind(&c.place)
        .bind(c.observed_at)
        .bind(c.pollution_type.map(|t| t.as_str()))
        .bind(&c.description)
        .bind(c.latitude)
        .bind(c.longitude)
        .bind(photo_data)
        .bind(photo_mime)
        .execute(&self.db)
        .await
        .context("update pollution")?;
        Ok(result.rows_affected())
    }

    async fn delete(&self, id: i64) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM pollutions WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete pollution")?;
        Ok(result.rows_affected())
    }
}
