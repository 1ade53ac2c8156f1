use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::{
    domain::{CitizenId, CitizenRecord, StoredCitizen},
    error::StoreError,
};

pub use shared::store::CitizenStore;

const DUPLICATE_ID_MESSAGE: &str = "duplicate id";

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // Every in-memory connection is a distinct database.
        let max_connections = if database_url.contains(":memory:") {
            1
        } else {
            5
        };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to open citizen database '{database_url}'"))?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to apply citizen migrations")?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn save_citizen(&self, record: &CitizenRecord) -> Result<StoredCitizen> {
        if record.is_empty() {
            return Err(StoreError::validation("citizen record is empty").into());
        }

        let payload = serde_json::to_string(record).context("failed to encode citizen record")?;
        let created_at = Utc::now();
        let rec = sqlx::query(
            "INSERT INTO citizens (external_id, payload, created_at) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(record.external_id())
        .bind(&payload)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(StoredCitizen {
            citizen_id: CitizenId(rec.get::<i64, _>(0)),
            record: record.clone(),
            created_at,
        })
    }

    pub async fn list_citizens(&self) -> Result<Vec<StoredCitizen>> {
        let rows = sqlx::query("SELECT id, payload, created_at FROM citizens ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(citizen_from_row).collect()
    }

    pub async fn citizen_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM citizens")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn citizen_from_row(row: &SqliteRow) -> Result<StoredCitizen> {
    let citizen_id = CitizenId(row.try_get::<i64, _>("id")?);
    let payload: String = row.try_get("payload")?;
    let record = serde_json::from_str::<CitizenRecord>(&payload)
        .with_context(|| format!("corrupt payload for citizen {}", citizen_id.0))?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    Ok(StoredCitizen {
        citizen_id,
        record,
        created_at,
    })
}

fn into_store_error(err: anyhow::Error) -> StoreError {
    if let Some(store_err) = err.downcast_ref::<StoreError>() {
        return store_err.clone();
    }

    match err.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            StoreError::duplicate(DUPLICATE_ID_MESSAGE)
        }
        Some(sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)) => {
            StoreError::unavailable(format!("citizen database unavailable: {err}"))
        }
        _ => StoreError::internal(format!("{err:#}")),
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.contains(":memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[async_trait]
impl CitizenStore for Storage {
    async fn save(&self, record: CitizenRecord) -> std::result::Result<StoredCitizen, StoreError> {
        self.save_citizen(&record).await.map_err(into_store_error)
    }

    async fn list_all(&self) -> std::result::Result<Vec<StoredCitizen>, StoreError> {
        self.list_citizens().await.map_err(into_store_error)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
