// src/config.rs
use serde::Deserialize;
use std::time::Duration;

const APP_USER_AGENT: &str = "ShuffleCastPodcastClient/0.1 \
     Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/109.0.0.0 Safari/537.36";

/// Tunables shared by the feed store and the playback controller.
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```
/// let config = shufflecast::config::ClientConfig::from_json_str(r#"{"tick_interval_ms": 500}"#).unwrap();
/// assert_eq!(config.tick_interval().as_millis(), 500);
/// assert_eq!(config.request_timeout().as_secs(), 10);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub max_feed_bytes: usize,
    pub tick_interval_ms: u64,
    pub episode_limit: Option<usize>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: APP_USER_AGENT.to_string(),
            request_timeout_secs: 10,
            max_feed_bytes: 20 * 1024 * 1024,
            tick_interval_ms: 1000,
            episode_limit: None,
        }
    }
}

impl ClientConfig {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}
