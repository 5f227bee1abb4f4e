use std::env;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.twitter.com/1.1";

/// Runtime configuration for the rate-limit client and its transport worker.
/// Values are sourced from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub token: String,
    pub api_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub queue_capacity: usize,
    pub max_retries: u32,
    pub call_timeout: Option<Duration>,
}

impl Config {
    /// Config with defaults for everything but the endpoint and token.
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_url: api_url.into(),
            user_agent: default_user_agent(),
            timeout_secs: 30,
            queue_capacity: 16,
            max_retries: 5,
            call_timeout: None,
        }
    }

    /// Load configuration from environment.
    ///
    /// Env vars:
    /// - TWITTER_BEARER_TOKEN (or TWITTER_TOKEN) [required]
    /// - TWITTER_API_URL (default: https://api.twitter.com/1.1)
    /// - TWITTER_HTTP_TIMEOUT_SECS (default: 30)
    /// - TWITTER_USER_AGENT (default: twitter-ratelimit/<version>)
    /// - TWITTER_QUEUE_CAPACITY (default: 16)
    /// - TWITTER_MAX_RETRIES (default: 5)
    /// - TWITTER_CALL_TIMEOUT_SECS (default: unset, wait indefinitely)
    pub fn from_env() -> Result<Self, String> {
        let token = env::var("TWITTER_BEARER_TOKEN")
            .or_else(|_| env::var("TWITTER_TOKEN"))
            .map_err(|_| "Missing TWITTER_BEARER_TOKEN or TWITTER_TOKEN".to_string())?;

        let api_url = env::var("TWITTER_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let mut cfg = Self::new(api_url, token);

        if let Some(secs) = parse_var::<u64>("TWITTER_HTTP_TIMEOUT_SECS") {
            cfg.timeout_secs = secs.max(1);
        }
        if let Ok(ua) = env::var("TWITTER_USER_AGENT") {
            cfg.user_agent = ua;
        }
        if let Some(cap) = parse_var::<usize>("TWITTER_QUEUE_CAPACITY") {
            cfg.queue_capacity = cap.max(1);
        }
        if let Some(n) = parse_var::<u32>("TWITTER_MAX_RETRIES") {
            cfg.max_retries = n;
        }
        cfg.call_timeout = parse_var::<u64>("TWITTER_CALL_TIMEOUT_SECS").map(Duration::from_secs);

        Ok(cfg)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
}

fn default_user_agent() -> String {
    format!("twitter-ratelimit/{}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_defaults() {
        let cfg = Config::new(DEFAULT_API_URL, "t");
        assert_eq!(cfg.token, "t");
        assert_eq!(cfg.timeout_secs, 30);
        assert_eq!(cfg.queue_capacity, 16);
        assert_eq!(cfg.max_retries, 5);
        assert!(cfg.call_timeout.is_none());
        assert!(cfg.user_agent.starts_with("twitter-ratelimit/"));
    }

    // Only test in this crate that touches process env.
    #[test]
    fn zero_limits_from_env_are_clamped() {
        env::set_var("TWITTER_BEARER_TOKEN", "t");
        env::set_var("TWITTER_HTTP_TIMEOUT_SECS", "0");
        env::set_var("TWITTER_QUEUE_CAPACITY", "0");
        let cfg = Config::from_env().unwrap();
        env::remove_var("TWITTER_HTTP_TIMEOUT_SECS");
        env::remove_var("TWITTER_QUEUE_CAPACITY");
        env::remove_var("TWITTER_BEARER_TOKEN");
        assert_eq!(cfg.timeout_secs, 1);
        assert_eq!(cfg.queue_capacity, 1);
    }
}
