use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use crate::feed::{Branch, BranchDirectory, FeedError, MetricsGateway};
use crate::periods::PeriodViewResolver;
use crate::snapshots::{
    InMemorySnapshotStore, PeriodSnapshot, PersistenceFailure, SnapshotError, SnapshotStore,
    ValidatedSnapshot,
};
use crate::tiers::RawMetricsRow;

pub(super) fn directory() -> BranchDirectory {
    BranchDirectory::new([
        Branch {
            key: "norte".to_string(),
            label: "Sucursal Norte".to_string(),
            feed_ref: "sheets/norte".to_string(),
        },
        Branch {
            key: "sur".to_string(),
            label: "Sucursal Sur".to_string(),
            feed_ref: "sheets/sur".to_string(),
        },
    ])
}

pub(super) fn row(value: serde_json::Value) -> RawMetricsRow {
    serde_json::from_value(value).expect("row deserializes")
}

pub(super) fn march_rows() -> Vec<RawMetricsRow> {
    vec![
        row(json!({
            "representative": "Ana Gómez",
            "supervisor": "Marta",
            "projected_tier": "Senior",
            "efficiency": "93%",
            "coverage": "104",
            "volume": "85",
            "pos_presence": "82",
            "display_compliance": "88",
            "route_compliance": "SI",
            "effectiveness_compliance": "si",
            "avg_route_duration": "5:20:00"
        })),
        row(json!({
            "representative": "Bruno Díaz",
            "supervisor": "Marta",
            "projected_tier": "junior",
            "efficiency": "72",
            "coverage": "61",
            "volume": "40",
            "pos_presence": "58",
            "display_compliance": "abc"
        })),
    ]
}

/// Gateway serving whatever rows the test last published.
#[derive(Default)]
pub(super) struct SheetGateway {
    rows: Mutex<Vec<RawMetricsRow>>,
    calls: AtomicUsize,
}

impl SheetGateway {
    pub(super) fn with_rows(rows: Vec<RawMetricsRow>) -> Self {
        Self {
            rows: Mutex::new(rows),
            calls: AtomicUsize::new(0),
        }
    }

    pub(super) fn publish(&self, rows: Vec<RawMetricsRow>) {
        *self.rows.lock().expect("sheet mutex poisoned") = rows;
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricsGateway for SheetGateway {
    async fn fetch(&self, _branch: &Branch) -> Result<Vec<RawMetricsRow>, FeedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows.lock().expect("sheet mutex poisoned").clone())
    }
}

pub(super) struct FailingGateway;

#[async_trait]
impl MetricsGateway for FailingGateway {
    async fn fetch(&self, _branch: &Branch) -> Result<Vec<RawMetricsRow>, FeedError> {
        Err(FeedError::Upstream {
            message: "sheet not shared".to_string(),
            code: Some(403),
        })
    }
}

pub(super) struct BrokenStore;

#[async_trait]
impl SnapshotStore for BrokenStore {
    async fn append(&self, _snapshot: ValidatedSnapshot) -> Result<PeriodSnapshot, SnapshotError> {
        Err(SnapshotError::Persistence(PersistenceFailure {
            message: "database is locked".to_string(),
            code: Some("5".to_string()),
            detail: Some("constraint busy".to_string()),
            hint: Some("retry after the import finishes".to_string()),
        }))
    }

    async fn snapshots_for(&self, _branch_key: &str) -> Result<Vec<PeriodSnapshot>, SnapshotError> {
        Ok(Vec::new())
    }
}

pub(super) type MemoryResolver = PeriodViewResolver<SheetGateway, InMemorySnapshotStore>;

pub(super) fn memory_resolver(
    rows: Vec<RawMetricsRow>,
) -> (
    Arc<MemoryResolver>,
    Arc<SheetGateway>,
    Arc<InMemorySnapshotStore>,
) {
    let gateway = Arc::new(SheetGateway::with_rows(rows));
    let store = Arc::new(InMemorySnapshotStore::default());
    let resolver = Arc::new(PeriodViewResolver::new(
        directory(),
        gateway.clone(),
        store.clone(),
    ));
    (resolver, gateway, store)
}
