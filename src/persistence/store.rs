//! SQLite-based state store

use crate::core::{CompletionEvent, Context, PipelineState};
use crate::persistence::{CompletionLog, StateStore, StoreError};
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};

/// SQLite state store
///
/// Holds one `pipeline_state` row per pipeline id with the context as a
/// JSON blob, and one `completion_log` row per pipeline id with the latest
/// completion.
pub struct SqliteStateStore {
    pool: SqlitePool,
}

impl SqliteStateStore {
    /// Create a new SQLite store
    pub async fn new(db_path: &str) -> Result<Self, StoreError> {
        let url = if db_path == ":memory:" {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite:{}?mode=rwc", db_path)
        };

        // One connection: an in-memory database exists per connection, and
        // the write load here is a handful of operator requests.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&url)
            .await?;

        let store = Self { pool };
        store.init().await?;

        Ok(store)
    }

    /// Create a store at the default path
    pub async fn with_default_path() -> anyhow::Result<Self> {
        let data_dir = dirs::data_local_dir().unwrap_or_else(|| std::path::PathBuf::from("."));
        let db_dir = data_dir.join("conveyor");
        std::fs::create_dir_all(&db_dir)?;

        let db_path = db_dir.join("state.db");
        Ok(Self::new(db_path.to_str().unwrap()).await?)
    }

    /// Initialize database schema
    async fn init(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pipeline_state (
                pipeline_id TEXT PRIMARY KEY,
                step_index INTEGER NOT NULL,
                presented INTEGER NOT NULL,
                version INTEGER NOT NULL,
                context TEXT NOT NULL,
                started_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS completion_log (
                pipeline_id TEXT PRIMARY KEY,
                success INTEGER NOT NULL,
                completed_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Convert DateTime<Utc> to NaiveDateTime for SQLite
    fn to_naive(dt: DateTime<Utc>) -> NaiveDateTime {
        dt.naive_utc()
    }

    /// Convert NaiveDateTime to DateTime<Utc>
    fn from_naive(dt: NaiveDateTime) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(dt, Utc)
    }

    fn state_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<PipelineState, StoreError> {
        let context: Context = serde_json::from_str(&row.get::<String, _>("context"))?;
        Ok(PipelineState {
            pipeline_id: row.get("pipeline_id"),
            step_index: row.get::<i64, _>("step_index") as usize,
            presented: row.get::<i64, _>("presented") != 0,
            version: row.get::<i64, _>("version") as u64,
            context,
            started_at: Self::from_naive(row.get("started_at")),
            updated_at: Self::from_naive(row.get("updated_at")),
        })
    }

    /// Current stored version for a pipeline id, 0 when absent
    async fn stored_version(&self, pipeline_id: &str) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT version FROM pipeline_state WHERE pipeline_id = ?1")
            .bind(pipeline_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get::<i64, _>("version") as u64).unwrap_or(0))
    }
}

#[async_trait::async_trait]
impl StateStore for SqliteStateStore {
    async fn load(&self, pipeline_id: &str) -> Result<Option<PipelineState>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT pipeline_id, step_index, presented, version, context, started_at, updated_at
            FROM pipeline_state
            WHERE pipeline_id = ?1
            "#,
        )
        .bind(pipeline_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| Self::state_from_row(&row)).transpose()
    }

    async fn save(&self, state: &PipelineState) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO pipeline_state
            (pipeline_id, step_index, presented, version, context, started_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&state.pipeline_id)
        .bind(state.step_index as i64)
        .bind(state.presented as i64)
        .bind(state.version as i64)
        .bind(serde_json::to_string(&state.context)?)
        .bind(Self::to_naive(state.started_at))
        .bind(Self::to_naive(state.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, pipeline_id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM pipeline_state WHERE pipeline_id = ?1")
            .bind(pipeline_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn compare_and_save(
        &self,
        state: &PipelineState,
        expected_version: u64,
    ) -> Result<(), StoreError> {
        let context = serde_json::to_string(&state.context)?;

        let result = if expected_version == 0 {
            // Expecting no stored record.
            sqlx::query(
                r#"
                INSERT INTO pipeline_state
                (pipeline_id, step_index, presented, version, context, started_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(pipeline_id) DO NOTHING
                "#,
            )
            .bind(&state.pipeline_id)
            .bind(state.step_index as i64)
            .bind(state.presented as i64)
            .bind(state.version as i64)
            .bind(&context)
            .bind(Self::to_naive(state.started_at))
            .bind(Self::to_naive(state.updated_at))
            .execute(&self.pool)
            .await?
        } else {
            sqlx::query(
                r#"
                UPDATE pipeline_state
                SET step_index = ?2, presented = ?3, version = ?4, context = ?5,
                    started_at = ?6, updated_at = ?7
                WHERE pipeline_id = ?1 AND version = ?8
                "#,
            )
            .bind(&state.pipeline_id)
            .bind(state.step_index as i64)
            .bind(state.presented as i64)
            .bind(state.version as i64)
            .bind(&context)
            .bind(Self::to_naive(state.started_at))
            .bind(Self::to_naive(state.updated_at))
            .bind(expected_version as i64)
            .execute(&self.pool)
            .await?
        };

        if result.rows_affected() == 0 {
            let found = self.stored_version(&state.pipeline_id).await?;
            return Err(StoreError::Conflict {
                expected: expected_version,
                found,
            });
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl CompletionLog for SqliteStateStore {
    async fn record_completion(&self, event: &CompletionEvent) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO completion_log (pipeline_id, success, completed_at)
            VALUES (?1, ?2, ?3)
            "#,
        )
        .bind(&event.pipeline_id)
        .bind(event.success as i64)
        .bind(Self::to_naive(event.timestamp))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn last_completion(
        &self,
        pipeline_id: &str,
    ) -> Result<Option<CompletionEvent>, StoreError> {
        let row = sqlx::query(
            "SELECT pipeline_id, success, completed_at FROM completion_log WHERE pipeline_id = ?1",
        )
        .bind(pipeline_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| CompletionEvent {
            pipeline_id: row.get("pipeline_id"),
            success: row.get::<i64, _>("success") != 0,
            timestamp: Self::from_naive(row.get("completed_at")),
        }))
    }

    async fn last_completions(&self) -> Result<Vec<CompletionEvent>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT pipeline_id, success, completed_at
            FROM completion_log
            ORDER BY pipeline_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| CompletionEvent {
                pipeline_id: row.get("pipeline_id"),
                success: row.get::<i64, _>("success") != 0,
                timestamp: Self::from_naive(row.get("completed_at")),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sqlite_state_round_trip() {
        let store = SqliteStateStore::new(":memory:").await.unwrap();

        let mut state = PipelineState::new("demo");
        state.context.set("choice", "B");
        state.mark_presented();

        store.save(&state).await.unwrap();
        let loaded = store.load("demo").await.unwrap().unwrap();

        assert_eq!(loaded.pipeline_id, "demo");
        assert_eq!(loaded.step_index, 0);
        assert!(loaded.presented);
        assert_eq!(loaded.context.get_str("choice"), Some("B"));
    }

    #[tokio::test]
    async fn test_sqlite_completion_log() {
        let store = SqliteStateStore::new(":memory:").await.unwrap();

        let event = CompletionEvent::success("demo");
        store.record_completion(&event).await.unwrap();

        let loaded = store.last_completion("demo").await.unwrap().unwrap();
        assert_eq!(loaded.pipeline_id, "demo");
        assert!(loaded.success);
    }
}
