//! Append-only log of closed periods.
//!
//! Stores expose insertion and reads only. Repeated closes of the same branch and month
//! are appended as independent records; lookups by period resolve to the newest one.

pub mod domain;
pub mod memory;
pub mod sqlite;

pub use domain::{
    NewSnapshot, PeriodSnapshot, PersistenceFailure, SnapshotError, SnapshotId,
    SnapshotSummary, ValidatedSnapshot,
};
pub use memory::InMemorySnapshotStore;
pub use sqlite::SqliteSnapshotStore;

use async_trait::async_trait;

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Append a validated record, returning it with its assigned identity and timestamp.
    async fn append(&self, snapshot: ValidatedSnapshot) -> Result<PeriodSnapshot, SnapshotError>;

    /// Snapshots of a branch, most recently closed first.
    async fn snapshots_for(&self, branch_key: &str) -> Result<Vec<PeriodSnapshot>, SnapshotError>;

    /// Validate and append a close request. Nothing is written when validation fails.
    async fn close(&self, request: NewSnapshot) -> Result<SnapshotId, SnapshotError> {
        let validated = request.validate()?;
        let record = self.append(validated).await?;
        tracing::info!(
            snapshot_id = %record.id,
            branch = %record.branch_key,
            year = record.period_year,
            month = record.period_month,
            "period snapshot appended"
        );
        Ok(record.id)
    }

    async fn list(&self, branch_key: &str) -> Result<Vec<SnapshotSummary>, SnapshotError> {
        if branch_key.trim().is_empty() {
            return Ok(Vec::new());
        }
        let records = self.snapshots_for(branch_key.trim()).await?;
        Ok(records.iter().map(PeriodSnapshot::summary).collect())
    }

    /// Newest snapshot closed for the given branch and month.
    async fn find_period(
        &self,
        branch_key: &str,
        year: i32,
        month: u32,
    ) -> Result<Option<PeriodSnapshot>, SnapshotError> {
        if branch_key.trim().is_empty() {
            return Ok(None);
        }
        let records = self.snapshots_for(branch_key.trim()).await?;
        Ok(records
            .into_iter()
            .find(|record| record.matches_period(year, month)))
    }
}
