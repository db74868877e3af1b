use crate::error::CrawlError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Configuration for a skeleton crawl
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// URL to start crawling from
    pub start_url: String,

    /// Maximum number of pages to visit
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Maximum link depth from the seed
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Number of concurrent browser sessions
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Per-page navigation timeout in seconds
    #[serde(default = "default_nav_timeout_secs")]
    pub nav_timeout_secs: u64,

    /// How long a worker waits on an empty frontier before giving up,
    /// in seconds
    #[serde(default = "default_frontier_idle_secs")]
    pub frontier_idle_secs: u64,
}

/// Default value for max_pages
fn default_max_pages() -> usize {
    100
}

/// Default value for max_depth
fn default_max_depth() -> u32 {
    5
}

/// Default value for concurrency
fn default_concurrency() -> usize {
    8
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

/// Default per-page navigation timeout
fn default_nav_timeout_secs() -> u64 {
    15
}

/// Default frontier idle timeout
fn default_frontier_idle_secs() -> u64 {
    2
}

impl CrawlConfig {
    /// Create a new configuration with default values
    pub fn new(start_url: &str) -> Self {
        Self {
            start_url: start_url.to_string(),
            max_pages: default_max_pages(),
            max_depth: default_max_depth(),
            concurrency: default_concurrency(),
            webdriver_url: default_webdriver_url(),
            nav_timeout_secs: default_nav_timeout_secs(),
            frontier_idle_secs: default_frontier_idle_secs(),
        }
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CrawlError> {
        let mut file = File::open(path).map_err(|e| CrawlError::Config(e.to_string()))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| CrawlError::Config(e.to_string()))?;

        serde_json::from_str(&contents).map_err(|e| CrawlError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CrawlConfig::new("https://example.com");
        assert_eq!(config.max_pages, 100);
        assert_eq!(config.max_depth, 5);
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.webdriver_url, "http://localhost:4444");
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: CrawlConfig =
            serde_json::from_str(r#"{"start_url": "https://example.com", "max_pages": 10}"#)
                .unwrap();
        assert_eq!(config.max_pages, 10);
        assert_eq!(config.max_depth, 5);
        assert_eq!(config.concurrency, 8);
    }
}
