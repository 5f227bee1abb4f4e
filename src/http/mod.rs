use crate::config::Config;
use crate::dispatch::{HttpMethod, QueryJob, QueryResponse};
use crate::error::ApiError;
use crate::status::to_timestamp;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, RETRY_AFTER, USER_AGENT};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio::sync::mpsc;

/// Per-response quota headers (`x-rate-limit-*`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateMeta {
    pub limit: Option<i64>,
    pub remaining: Option<i64>,
    pub reset_at: Option<DateTime<Utc>>,
}

pub fn build_client(cfg: &Config) -> Result<Client, ApiError> {
    let mut default_headers = HeaderMap::new();
    let ua = HeaderValue::from_str(&cfg.user_agent)
        .map_err(|e| ApiError::Transport(format!("invalid user agent: {}", e)))?;
    default_headers.insert(USER_AGENT, ua);
    default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    // Authorization header is injected per request.
    Client::builder()
        .default_headers(default_headers)
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .use_rustls_tls()
        .build()
        .map_err(|e| ApiError::Transport(e.to_string()))
}

fn auth_header(token: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|e| ApiError::Transport(format!("invalid bearer token: {}", e)))
}

pub fn map_status_to_error(status: StatusCode, message: String) -> ApiError {
    let (code, retriable) = match status {
        StatusCode::BAD_REQUEST => ("bad_request", false),
        StatusCode::UNAUTHORIZED => ("unauthorized", false),
        StatusCode::FORBIDDEN => ("forbidden", false),
        StatusCode::NOT_FOUND => ("not_found", false),
        StatusCode::CONFLICT => ("conflict", false),
        StatusCode::TOO_MANY_REQUESTS => ("rate_limited", true),
        s if s.is_server_error() => ("upstream_error", true),
        _ => ("server_error", false),
    };
    ApiError::Http {
        status: status.as_u16(),
        code: code.to_string(),
        message,
        retriable,
    }
}

pub fn extract_rate_from_headers(headers: &HeaderMap) -> RateMeta {
    let num = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<i64>().ok())
    };
    RateMeta {
        limit: num("x-rate-limit-limit"),
        remaining: num("x-rate-limit-remaining"),
        reset_at: num("x-rate-limit-reset").map(to_timestamp),
    }
}

const MAX_BACKOFF_MS: u64 = 5_000;

fn compute_backoff(attempt: u32, retry_after: Option<Duration>) -> Duration {
    if let Some(d) = retry_after {
        return d.min(Duration::from_millis(MAX_BACKOFF_MS));
    }
    // Exponential backoff with jitter: base 200ms * 2^attempt, max 5s.
    let base = 200u64.saturating_mul(1u64 << attempt.min(5));
    let max = MAX_BACKOFF_MS.min(base);
    let jitter = fastrand::u64(0..=max / 2);
    Duration::from_millis(max / 2 + jitter)
}

/// Drains the dispatch queue and performs each job over HTTP.
pub struct Worker {
    client: Client,
    cfg: Config,
    rx: mpsc::Receiver<QueryJob>,
}

impl Worker {
    pub fn new(cfg: Config, rx: mpsc::Receiver<QueryJob>) -> Result<Self, ApiError> {
        let client = build_client(&cfg)?;
        Ok(Self { client, cfg, rx })
    }

    /// Spawn the drain loop on the current runtime. It ends once every
    /// `DispatchClient` feeding the queue has been dropped.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        info!("query worker started; api_url={}", self.cfg.api_url);
        while let Some(mut job) = self.rx.recv().await {
            if job.is_abandoned() {
                debug!("skipping abandoned job {}", job.id);
                continue;
            }
            let Some(response) = self.execute(&mut job).await else {
                debug!("caller for job {} gave up; dropped mid-flight", job.id);
                continue;
            };
            if let Err(e) = &response {
                debug!("job {} failed: {}", job.id, e);
            }
            let id = job.id;
            if !job.respond(response) {
                debug!("caller for job {} went away before the reply", id);
            }
        }
        info!("query worker stopped; dispatch queue closed");
    }

    /// Sleep for `delay`, or return false early if the caller gives up.
    async fn pause(job: &mut QueryJob, delay: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            _ = job.abandoned() => false,
        }
    }

    /// `None` means the caller stopped waiting and no reply is owed.
    async fn execute(&self, job: &mut QueryJob) -> Option<QueryResponse> {
        let auth = match auth_header(&self.cfg.token) {
            Ok(a) => a,
            Err(e) => return Some(Err(e)),
        };
        let mut attempt: u32 = 0;
        loop {
            if job.is_abandoned() {
                return None;
            }
            let req = match job.method {
                HttpMethod::Get => self.client.get(&job.url),
                HttpMethod::Post => self.client.post(&job.url),
            };
            let send = req
                .header(AUTHORIZATION, auth.clone())
                .query(&job.params)
                .send();
            let res = tokio::select! {
                res = send => res,
                _ = job.abandoned() => return None,
            };

            let res = match res {
                Ok(r) => r,
                Err(e) => {
                    warn!("{:?} {} error sending request: {}", job.method, job.url, e);
                    if attempt < self.cfg.max_retries {
                        if !Self::pause(job, compute_backoff(attempt, None)).await {
                            return None;
                        }
                        attempt += 1;
                        continue;
                    }
                    return Some(Err(ApiError::Transport(e.to_string())));
                }
            };

            let status = res.status();
            let rate = extract_rate_from_headers(res.headers());
            debug!("{} -> {} rate={:?}", job.url, status, rate);
            let retry_after = res
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs);

            if status.is_success() {
                return Some(
                    res.json::<serde_json::Value>()
                        .await
                        .map_err(|e| ApiError::Decode(e.to_string())),
                );
            }

            // Retry on 429/5xx
            if (status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error())
                && attempt < self.cfg.max_retries
            {
                let backoff = compute_backoff(attempt, retry_after);
                warn!(
                    "{:?} {} retrying (status {}), backoff {:?}",
                    job.method, job.url, status, backoff
                );
                if !Self::pause(job, backoff).await {
                    return None;
                }
                attempt += 1;
                continue;
            }
            let text = res.text().await.unwrap_or_default();
            return Some(Err(map_status_to_error(status, text)));
        }
    }
}
