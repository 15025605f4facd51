//! Branch metrics feed access.

pub mod branches;
pub mod http;
pub mod parser;

pub use branches::{Branch, BranchDirectory};
pub use http::HttpMetricsGateway;
pub use parser::{parse_body, parse_csv, parse_json, FeedFormat};

use crate::tiers::RawMetricsRow;
use async_trait::async_trait;

/// Source of the current period's raw rows for one branch.
///
/// Implementations perform exactly one upstream call per invocation, without caching or
/// retries, and never return a partially parsed collection.
#[async_trait]
pub trait MetricsGateway: Send + Sync {
    async fn fetch(&self, branch: &Branch) -> Result<Vec<RawMetricsRow>, FeedError>;

    /// Human-readable reference to the upstream source, recorded in snapshot metadata.
    fn source_ref(&self, branch: &Branch) -> String {
        branch.feed_ref.clone()
    }
}

/// Failure fetching or decoding a branch feed.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Transport(String),
    #[error("feed responded with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("feed reported an error: {message}")]
    Upstream { message: String, code: Option<i64> },
    #[error("feed response is not a row collection: {0}")]
    Malformed(String),
    #[error("invalid CSV feed data: {0}")]
    Csv(#[from] csv::Error),
}

impl FeedError {
    /// Numeric code the feed supplied, if any.
    pub fn code(&self) -> Option<i64> {
        match self {
            FeedError::Status { status, .. } => Some(i64::from(*status)),
            FeedError::Upstream { code, .. } => *code,
            FeedError::Transport(_) | FeedError::Malformed(_) | FeedError::Csv(_) => None,
        }
    }
}
