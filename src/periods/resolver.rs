use super::view::ViewMode;
use crate::feed::{Branch, BranchDirectory, FeedError, MetricsGateway};
use crate::snapshots::{
    NewSnapshot, PeriodSnapshot, PersistenceFailure, SnapshotError, SnapshotId, SnapshotStore,
    SnapshotSummary,
};
use crate::tiers::{ClassificationEngine, ClassificationResult, RawMetricsRow, TierBoard};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// Chooses between a freshly classified board and a stored close, per request.
pub struct PeriodViewResolver<G, S> {
    branches: Arc<BranchDirectory>,
    gateway: Arc<G>,
    store: Arc<S>,
    engine: ClassificationEngine,
}

impl<G, S> PeriodViewResolver<G, S>
where
    G: MetricsGateway + 'static,
    S: SnapshotStore + 'static,
{
    pub fn new(branches: BranchDirectory, gateway: Arc<G>, store: Arc<S>) -> Self {
        Self {
            branches: Arc::new(branches),
            gateway,
            store,
            engine: ClassificationEngine::default(),
        }
    }

    pub fn branches(&self) -> &BranchDirectory {
        &self.branches
    }

    pub fn branch(&self, branch_key: &str) -> Result<&Branch, ResolveError> {
        self.branches
            .get(branch_key)
            .ok_or_else(|| ResolveError::UnknownBranch(branch_key.to_string()))
    }

    pub async fn resolve(
        &self,
        branch_key: &str,
        mode: ViewMode,
    ) -> Result<PeriodBoard, ResolveError> {
        match mode {
            ViewMode::Live => {
                let branch = self.branch(branch_key)?;
                let (_, board) = self.live(branch).await?;
                Ok(PeriodBoard::Live(LiveBoard {
                    branch_key: branch.key.clone(),
                    branch: branch.label.clone(),
                    board,
                }))
            }
            ViewMode::Frozen { year, month } => {
                let snapshot = self.frozen(branch_key, year, month).await?;
                Ok(PeriodBoard::Frozen(FrozenBoard::from(snapshot)))
            }
        }
    }

    /// Classify the current feed and append it as the close for `year`/`month`.
    pub async fn close_period(
        &self,
        branch_key: &str,
        year: i32,
        month: u32,
        context: Option<Value>,
    ) -> Result<ClosedPeriod, ResolveError> {
        if !(1..=12).contains(&month) {
            return Err(SnapshotError::InvalidField {
                field: "period_month",
                reason: format!("{month} is not a month between 1 and 12"),
            }
            .into());
        }

        let branch = self.branch(branch_key)?;
        let (rows, board) = self.live(branch).await?;
        let payload = serde_json::to_value(&rows).map_err(|err| {
            SnapshotError::Persistence(PersistenceFailure::message(format!(
                "live rows could not be serialized: {err}"
            )))
        })?;

        let mut meta = json!({
            "source": self.gateway.source_ref(branch),
            "representatives": rows.len(),
        });
        if let Some(context) = context.filter(|value| !value.is_null()) {
            meta["context"] = context;
        }

        let id = self
            .store
            .close(NewSnapshot {
                branch_key: Some(branch.key.clone()),
                branch: Some(branch.label.clone()),
                period_year: Some(year),
                period_month: Some(month),
                payload: Some(payload),
                meta: Some(meta),
            })
            .await?;

        info!(branch = %branch.key, year, month, snapshot_id = %id, "period closed");

        Ok(ClosedPeriod {
            id,
            branch_key: branch.key.clone(),
            branch: branch.label.clone(),
            period_year: year,
            period_month: month,
            representatives: board.representatives.len(),
            next_view: ViewMode::Frozen { year, month },
        })
    }

    pub async fn list_periods(&self, branch_key: &str) -> Result<Vec<SnapshotSummary>, ResolveError> {
        Ok(self.store.list(branch_key).await?)
    }

    /// Comparison detail for one representative. Frozen detail re-classifies the stored
    /// rows with the current catalog; the frozen board itself is never re-classified.
    pub async fn representative(
        &self,
        branch_key: &str,
        representative: &str,
        mode: ViewMode,
    ) -> Result<ClassificationResult, ResolveError> {
        let board = match mode {
            ViewMode::Live => self.live(self.branch(branch_key)?).await?.1,
            ViewMode::Frozen { year, month } => {
                let snapshot = self.frozen(branch_key, year, month).await?;
                let rows: Vec<RawMetricsRow> = serde_json::from_value(snapshot.payload)
                    .map_err(|err| ResolveError::UnreadablePayload {
                        id: snapshot.id,
                        reason: err.to_string(),
                    })?;
                self.engine.classify_all(&rows)
            }
        };

        board
            .find(representative)
            .cloned()
            .ok_or_else(|| ResolveError::UnknownRepresentative {
                branch_key: branch_key.to_string(),
                representative: representative.to_string(),
            })
    }

    async fn live(&self, branch: &Branch) -> Result<(Vec<RawMetricsRow>, TierBoard), ResolveError> {
        let rows = self.gateway.fetch(branch).await.map_err(|source| {
            warn!(branch = %branch.key, error = %source, "live metrics unavailable");
            ResolveError::Fetch {
                branch_key: branch.key.clone(),
                source,
            }
        })?;
        let board = self.engine.classify_all(&rows);
        info!(branch = %branch.key, representatives = rows.len(), "live board classified");
        Ok((rows, board))
    }

    async fn frozen(
        &self,
        branch_key: &str,
        year: i32,
        month: u32,
    ) -> Result<PeriodSnapshot, ResolveError> {
        match self.store.find_period(branch_key, year, month).await? {
            Some(snapshot) => Ok(snapshot),
            None => Err(ResolveError::NoSnapshot {
                branch_key: branch_key.to_string(),
                year,
                month,
            }),
        }
    }
}

/// Board returned to consumers, tagged with the view that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PeriodBoard {
    Live(LiveBoard),
    Frozen(FrozenBoard),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveBoard {
    pub branch_key: String,
    pub branch: String,
    pub board: TierBoard,
}

/// A closed period exactly as stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrozenBoard {
    pub branch_key: String,
    pub branch: String,
    pub snapshot: SnapshotSummary,
    pub payload: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl From<PeriodSnapshot> for FrozenBoard {
    fn from(snapshot: PeriodSnapshot) -> Self {
        let summary = snapshot.summary();
        Self {
            branch_key: snapshot.branch_key,
            branch: snapshot.branch,
            snapshot: summary,
            payload: snapshot.payload,
            meta: snapshot.meta,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClosedPeriod {
    pub id: SnapshotId,
    pub branch_key: String,
    pub branch: String,
    pub period_year: i32,
    pub period_month: u32,
    pub representatives: usize,
    pub next_view: ViewMode,
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("unknown branch '{0}'")]
    UnknownBranch(String),
    #[error("metrics feed for branch '{branch_key}' failed: {source}")]
    Fetch {
        branch_key: String,
        #[source]
        source: FeedError,
    },
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error("no snapshot for branch '{branch_key}' in {year}-{month:02}")]
    NoSnapshot {
        branch_key: String,
        year: i32,
        month: u32,
    },
    #[error("representative '{representative}' not found on branch '{branch_key}'")]
    UnknownRepresentative {
        branch_key: String,
        representative: String,
    },
    #[error("snapshot {id} payload is not a row collection: {reason}")]
    UnreadablePayload { id: SnapshotId, reason: String },
}
