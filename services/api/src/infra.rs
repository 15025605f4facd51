use async_trait::async_trait;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tier_board::config::AppConfig;
use tier_board::error::AppError;
use tier_board::feed::HttpMetricsGateway;
use tier_board::periods::PeriodViewResolver;
use tier_board::snapshots::{
    InMemorySnapshotStore, PeriodSnapshot, SnapshotError, SnapshotStore, SqliteSnapshotStore,
    ValidatedSnapshot,
};
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Snapshot store selected by `APP_SNAPSHOT_DB`.
#[derive(Debug, Clone)]
pub(crate) enum ConfiguredStore {
    Memory(InMemorySnapshotStore),
    Sqlite(SqliteSnapshotStore),
}

impl ConfiguredStore {
    pub(crate) async fn from_config(config: &AppConfig) -> Result<Self, SnapshotError> {
        match config.snapshots.database_url.as_deref() {
            Some(url) => {
                let store = SqliteSnapshotStore::connect(url).await?;
                info!(database = %url, "snapshot log opened");
                Ok(Self::Sqlite(store))
            }
            None => {
                warn!("APP_SNAPSHOT_DB not set; closed periods are kept in memory only");
                Ok(Self::Memory(InMemorySnapshotStore::default()))
            }
        }
    }

    pub(crate) fn is_durable(&self) -> bool {
        matches!(self, Self::Sqlite(_))
    }
}

#[async_trait]
impl SnapshotStore for ConfiguredStore {
    async fn append(&self, snapshot: ValidatedSnapshot) -> Result<PeriodSnapshot, SnapshotError> {
        match self {
            Self::Memory(store) => store.append(snapshot).await,
            Self::Sqlite(store) => store.append(snapshot).await,
        }
    }

    async fn snapshots_for(&self, branch_key: &str) -> Result<Vec<PeriodSnapshot>, SnapshotError> {
        match self {
            Self::Memory(store) => store.snapshots_for(branch_key).await,
            Self::Sqlite(store) => store.snapshots_for(branch_key).await,
        }
    }
}

pub(crate) type BoardResolver = PeriodViewResolver<HttpMetricsGateway, ConfiguredStore>;

pub(crate) async fn build_resolver(config: &AppConfig) -> Result<Arc<BoardResolver>, AppError> {
    if config.feed.branches.is_empty() {
        warn!("APP_BRANCHES is empty; every live board request will report an unknown branch");
    }
    let gateway = HttpMetricsGateway::new(config.feed.base_url.clone(), config.feed.timeout)?;
    let store = ConfiguredStore::from_config(config).await?;
    info!(
        durable = store.is_durable(),
        branches = config.feed.branches.iter().count(),
        "board resolver assembled"
    );
    Ok(Arc::new(PeriodViewResolver::new(
        config.feed.branches.clone(),
        Arc::new(gateway),
        Arc::new(store),
    )))
}
