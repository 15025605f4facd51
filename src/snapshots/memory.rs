use super::domain::{
    PeriodSnapshot, PersistenceFailure, SnapshotError, SnapshotId, ValidatedSnapshot,
};
use super::SnapshotStore;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct SnapshotLog {
    records: Vec<PeriodSnapshot>,
    by_branch: HashMap<String, Vec<usize>>,
}

/// Process-local append-only log; records live in an arena indexed by branch key.
#[derive(Debug, Default, Clone)]
pub struct InMemorySnapshotStore {
    log: Arc<Mutex<SnapshotLog>>,
}

impl InMemorySnapshotStore {
    fn lock(&self) -> Result<MutexGuard<'_, SnapshotLog>, SnapshotError> {
        self.log.lock().map_err(|_| {
            SnapshotError::Persistence(PersistenceFailure::message("snapshot log lock poisoned"))
        })
    }

    pub fn len(&self) -> usize {
        self.log.lock().map(|log| log.records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn append(&self, snapshot: ValidatedSnapshot) -> Result<PeriodSnapshot, SnapshotError> {
        let mut log = self.lock()?;
        let position = log.records.len();
        let id = SnapshotId(position as i64 + 1);
        let record = snapshot.into_record(id, Utc::now());

        log.by_branch
            .entry(record.branch_key.clone())
            .or_default()
            .push(position);
        log.records.push(record.clone());
        Ok(record)
    }

    async fn snapshots_for(&self, branch_key: &str) -> Result<Vec<PeriodSnapshot>, SnapshotError> {
        let log = self.lock()?;
        let mut records: Vec<PeriodSnapshot> = log
            .by_branch
            .get(branch_key)
            .map(|positions| {
                positions
                    .iter()
                    .filter_map(|position| log.records.get(*position).cloned())
                    .collect()
            })
            .unwrap_or_default();

        records.sort_by(|a, b| b.closed_at.cmp(&a.closed_at).then(b.id.cmp(&a.id)));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshots::NewSnapshot;
    use serde_json::json;

    fn request(branch_key: &str, year: i32, month: Option<u32>) -> NewSnapshot {
        NewSnapshot {
            branch_key: Some(branch_key.to_string()),
            branch: Some(format!("Sucursal {branch_key}")),
            period_year: Some(year),
            period_month: month,
            payload: Some(json!([{ "representative": "Ana", "projected_tier": "Junior" }])),
            meta: Some(json!({ "source": "test" })),
        }
    }

    #[tokio::test]
    async fn close_then_list_returns_newest_first() {
        let store = InMemorySnapshotStore::default();
        store
            .close(request("norte", 2025, Some(2)))
            .await
            .expect("february closes");
        store
            .close(request("norte", 2025, Some(3)))
            .await
            .expect("march closes");
        store
            .close(request("sur", 2025, Some(4)))
            .await
            .expect("other branch closes");

        let listed = store.list("norte").await.expect("list succeeds");
        assert_eq!(listed.len(), 2);
        assert_eq!((listed[0].period_year, listed[0].period_month), (2025, 3));
        assert_eq!((listed[1].period_year, listed[1].period_month), (2025, 2));
    }

    #[tokio::test]
    async fn rejected_close_writes_nothing() {
        let store = InMemorySnapshotStore::default();
        let err = store
            .close(request("norte", 2025, None))
            .await
            .expect_err("month is required");

        assert!(matches!(err, SnapshotError::Validation { .. }));
        assert!(store.list("norte").await.expect("list").is_empty());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn repeated_closes_append_independent_records() {
        let store = InMemorySnapshotStore::default();
        let first = store
            .close(request("norte", 2025, Some(3)))
            .await
            .expect("first close");
        let second = store
            .close(request("norte", 2025, Some(3)))
            .await
            .expect("second close");

        assert_ne!(first, second);
        assert_eq!(store.list("norte").await.expect("list").len(), 2);

        let found = store
            .find_period("norte", 2025, 3)
            .await
            .expect("lookup")
            .expect("snapshot present");
        assert_eq!(found.id, second);
    }

    #[tokio::test]
    async fn empty_or_unknown_branch_lists_nothing() {
        let store = InMemorySnapshotStore::default();
        store
            .close(request("norte", 2025, Some(1)))
            .await
            .expect("close");

        assert!(store.list("").await.expect("empty key").is_empty());
        assert!(store.list("oeste").await.expect("unknown").is_empty());
        assert!(store
            .find_period("norte", 2024, 1)
            .await
            .expect("lookup")
            .is_none());
    }

    #[tokio::test]
    async fn payload_is_stored_verbatim() {
        let store = InMemorySnapshotStore::default();
        let original = request("norte", 2025, Some(5));
        let payload = original.payload.clone();
        store.close(original).await.expect("close");

        let stored = store
            .find_period("norte", 2025, 5)
            .await
            .expect("lookup")
            .expect("present");
        assert_eq!(Some(stored.payload), payload);
        assert_eq!(stored.meta, Some(json!({ "source": "test" })));
    }
}
