use super::domain::{
    PeriodSnapshot, PersistenceFailure, SnapshotError, SnapshotId, ValidatedSnapshot,
};
use super::SnapshotStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use tracing::debug;

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS period_snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    branch_key TEXT NOT NULL,
    branch TEXT NOT NULL,
    period_year INTEGER NOT NULL,
    period_month INTEGER NOT NULL CHECK (period_month BETWEEN 1 AND 12),
    payload TEXT NOT NULL,
    meta TEXT,
    closed_at TEXT NOT NULL
)
"#;

const CREATE_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_period_snapshots_branch
    ON period_snapshots (branch_key, id DESC)
"#;

/// SQLite-backed snapshot log. The table has no uniqueness constraint on
/// (branch_key, period_year, period_month).
#[derive(Debug, Clone)]
pub struct SqliteSnapshotStore {
    pool: SqlitePool,
}

impl SqliteSnapshotStore {
    pub async fn connect(url: &str) -> Result<Self, SnapshotError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let in_memory = url.contains(":memory:");

        // An in-memory database lives only as long as its single connection.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(options).await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), SnapshotError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_INDEX).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for SqliteSnapshotStore {
    async fn append(&self, snapshot: ValidatedSnapshot) -> Result<PeriodSnapshot, SnapshotError> {
        let closed_at = Utc::now();
        let payload = serde_json::to_string(&snapshot.payload).map_err(encode_failure)?;
        let meta = snapshot
            .meta
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(encode_failure)?;

        let result = sqlx::query(
            r#"
            INSERT INTO period_snapshots
                (branch_key, branch, period_year, period_month, payload, meta, closed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&snapshot.branch_key)
        .bind(&snapshot.branch)
        .bind(i64::from(snapshot.period_year))
        .bind(i64::from(snapshot.period_month))
        .bind(payload)
        .bind(meta)
        .bind(closed_at)
        .execute(&self.pool)
        .await?;

        let id = SnapshotId(result.last_insert_rowid());
        debug!(snapshot_id = %id, branch = %snapshot.branch_key, "snapshot row inserted");
        Ok(snapshot.into_record(id, closed_at))
    }

    async fn snapshots_for(&self, branch_key: &str) -> Result<Vec<PeriodSnapshot>, SnapshotError> {
        // Ids are assigned in close order, so id order is closed_at order.
        let rows = sqlx::query(
            r#"
            SELECT id, branch_key, branch, period_year, period_month, payload, meta, closed_at
            FROM period_snapshots
            WHERE branch_key = ?
            ORDER BY id DESC
            "#,
        )
        .bind(branch_key)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(record_from_row).collect()
    }
}

fn record_from_row(row: &SqliteRow) -> Result<PeriodSnapshot, SnapshotError> {
    let period_year: i64 = row.try_get("period_year")?;
    let period_month: i64 = row.try_get("period_month")?;
    let payload: String = row.try_get("payload")?;
    let meta: Option<String> = row.try_get("meta")?;
    let closed_at: DateTime<Utc> = row.try_get("closed_at")?;

    Ok(PeriodSnapshot {
        id: SnapshotId(row.try_get("id")?),
        branch_key: row.try_get("branch_key")?,
        branch: row.try_get("branch")?,
        period_year: i32::try_from(period_year).map_err(|_| out_of_range("period_year"))?,
        period_month: u32::try_from(period_month).map_err(|_| out_of_range("period_month"))?,
        payload: serde_json::from_str(&payload).map_err(decode_failure)?,
        meta: meta
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(decode_failure)?,
        closed_at,
    })
}

fn encode_failure(err: serde_json::Error) -> SnapshotError {
    SnapshotError::Persistence(PersistenceFailure {
        message: format!("payload could not be encoded: {err}"),
        code: None,
        detail: None,
        hint: None,
    })
}

fn decode_failure(err: serde_json::Error) -> SnapshotError {
    SnapshotError::Persistence(PersistenceFailure {
        message: format!("stored payload could not be decoded: {err}"),
        code: None,
        detail: None,
        hint: Some("the row was written by an incompatible version".to_string()),
    })
}

fn out_of_range(column: &str) -> SnapshotError {
    SnapshotError::Persistence(PersistenceFailure::message(format!(
        "stored {column} is out of range"
    )))
}
