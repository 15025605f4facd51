use super::parser::{parse_body, parse_json, FeedFormat};
use super::{Branch, FeedError, MetricsGateway};
use crate::tiers::RawMetricsRow;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

const USER_AGENT: &str = concat!("tier-board/", env!("CARGO_PKG_VERSION"));

/// Gateway fetching branch sheets over HTTP.
#[derive(Debug, Clone)]
pub struct HttpMetricsGateway {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl HttpMetricsGateway {
    pub fn new(base_url: Option<String>, timeout: Duration) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|err| FeedError::Transport(err.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.filter(|url| !url.trim().is_empty()),
        })
    }

    pub fn url_for(&self, branch: &Branch) -> Result<String, FeedError> {
        let reference = branch.feed_ref.trim();
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return Ok(reference.to_string());
        }

        match &self.base_url {
            Some(base) => Ok(format!(
                "{}/{}",
                base.trim_end_matches('/'),
                reference.trim_start_matches('/')
            )),
            None => Err(FeedError::Transport(format!(
                "branch '{}' uses relative feed reference '{}' but no feed base URL is configured",
                branch.key, reference
            ))),
        }
    }
}

#[async_trait]
impl MetricsGateway for HttpMetricsGateway {
    async fn fetch(&self, branch: &Branch) -> Result<Vec<RawMetricsRow>, FeedError> {
        let url = self.url_for(branch)?;
        debug!(branch = %branch.key, %url, "fetching branch metrics");

        let response = self
            .client
            .get(&url)
            .query(&[("branch", branch.key.as_str())])
            .send()
            .await
            .map_err(|err| FeedError::Transport(err.to_string()))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|err| FeedError::Transport(err.to_string()))?;

        if !status.is_success() {
            let message = match parse_json(&body) {
                Err(FeedError::Upstream { message, .. }) => message,
                _ => body.trim().chars().take(240).collect(),
            };
            warn!(branch = %branch.key, status = status.as_u16(), "branch feed rejected request");
            return Err(FeedError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let format = FeedFormat::from_content_type(content_type.as_deref());
        let rows = parse_body(format, &body)?;
        info!(branch = %branch.key, rows = rows.len(), ?format, "branch metrics fetched");
        Ok(rows)
    }

    fn source_ref(&self, branch: &Branch) -> String {
        self.url_for(branch)
            .unwrap_or_else(|_| branch.feed_ref.clone())
    }
}
