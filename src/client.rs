use crate::config::Config;
use crate::dispatch::{dispatch_queue, DispatchClient, HttpMethod};
use crate::error::ApiError;
use crate::http::Worker;
use crate::status::{assemble, Bundle, RateLimitStatus, RawRateLimitStatus};
use log::debug;
use url::Url;

const RATE_LIMIT_STATUS_PATH: &str = "application/rate_limit_status.json";

/// Caller-facing API handle. Clones share the same dispatch queue.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    queue: DispatchClient,
}

impl ApiClient {
    /// Build a client and spawn its HTTP worker on the current tokio runtime.
    pub fn new(cfg: Config) -> Result<Self, ApiError> {
        let (queue, rx) = dispatch_queue(cfg.queue_capacity);
        let queue = queue.with_call_timeout(cfg.call_timeout);
        let base_url = cfg.api_url.clone();
        Worker::new(cfg, rx)?.spawn();
        Self::with_queue(&base_url, queue)
    }

    /// Build a client on an existing queue; whoever holds the receiving end
    /// is responsible for answering jobs.
    pub fn with_queue(base_url: &str, queue: DispatchClient) -> Result<Self, ApiError> {
        let mut base = base_url.trim_end_matches('/').to_string();
        base.push('/');
        Ok(Self {
            base_url: Url::parse(&base)?,
            queue,
        })
    }

    fn endpoint(&self, path: &str) -> Result<String, ApiError> {
        Ok(self.base_url.join(path)?.to_string())
    }

    pub async fn get_rate_limit_status(&self) -> Result<RateLimitStatus, ApiError> {
        self.get_rate_limit_status_for(&[]).await
    }

    /// Fetch status for the given bundles only; an empty slice asks for all.
    /// Bundles the service leaves out come back as empty mappings.
    pub async fn get_rate_limit_status_for(
        &self,
        bundles: &[Bundle],
    ) -> Result<RateLimitStatus, ApiError> {
        let raw = self.get_rate_limit_status_raw_for(bundles).await?;
        Ok(assemble(&raw))
    }

    pub async fn get_rate_limit_status_raw(&self) -> Result<RawRateLimitStatus, ApiError> {
        self.get_rate_limit_status_raw_for(&[]).await
    }

    pub async fn get_rate_limit_status_raw_for(
        &self,
        bundles: &[Bundle],
    ) -> Result<RawRateLimitStatus, ApiError> {
        let mut params = Vec::new();
        if !bundles.is_empty() {
            let names: Vec<&str> = bundles.iter().map(|b| b.as_str()).collect();
            params.push(("resources".to_string(), names.join(",")));
        }
        let url = self.endpoint(RATE_LIMIT_STATUS_PATH)?;
        debug!("fetching rate limit status bundles={:?}", bundles);
        self.queue.submit(url, params, HttpMethod::Get).await
    }
}
