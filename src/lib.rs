// Re-export modules
pub mod browser;
pub mod config;
pub mod crawler;
pub mod error;
pub mod export;
pub mod filter;
pub mod template;
pub mod visitor;

// Re-export commonly used types for convenience
pub use config::CrawlConfig;
pub use crawler::{CrawlPhase, CrawlTask, Crawler};
pub use error::{CrawlError, VisitError};
pub use export::{CrawlReport, CrawlStats, ExportFormat};
pub use visitor::{PageVisit, PageVisitor};

use crate::browser::WebDriverVisitor;
use std::sync::Arc;
use std::time::Duration;

/// Builder for a site-skeleton crawl.
///
/// ```no_run
/// use sitebones::{ExportFormat, SiteSkeleton};
///
/// # async fn example() -> Result<(), sitebones::CrawlError> {
/// let report = SiteSkeleton::new("arxiv.org")
///     .with_max_pages(50)
///     .with_max_depth(4)
///     .with_concurrency(8)
///     .run()
///     .await?;
///
/// println!("{}", report.export(ExportFormat::Tree));
/// # Ok(())
/// # }
/// ```
pub struct SiteSkeleton {
    config: CrawlConfig,
}

impl SiteSkeleton {
    /// Create a new builder for the given seed URL
    pub fn new(start_url: &str) -> Self {
        Self {
            config: CrawlConfig::new(start_url),
        }
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: CrawlConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the page budget
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.config.max_pages = max_pages;
        self
    }

    /// Set the maximum link depth from the seed
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.config.max_depth = max_depth;
        self
    }

    /// Set the number of concurrent browser sessions
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    /// Point the crawler at a specific WebDriver endpoint
    pub fn with_webdriver_url(mut self, webdriver_url: &str) -> Self {
        self.config.webdriver_url = webdriver_url.to_string();
        self
    }

    /// Run the crawl against a WebDriver endpoint
    pub async fn run(self) -> Result<CrawlReport, CrawlError> {
        let mut config = self.config;

        // Override the WebDriver URL with an environment variable if provided
        if let Ok(webdriver_url) = std::env::var("WEBDRIVER_URL") {
            if !webdriver_url.is_empty() {
                config.webdriver_url = webdriver_url;
            }
        }

        let visitor = Arc::new(WebDriverVisitor::new(
            &config.webdriver_url,
            Duration::from_secs(config.nav_timeout_secs),
        ));

        Crawler::new(config, visitor)?.run().await
    }

    /// Run the crawl with a custom page visitor instead of the WebDriver
    /// one
    pub async fn run_with(self, visitor: Arc<dyn PageVisitor>) -> Result<CrawlReport, CrawlError> {
        Crawler::new(self.config, visitor)?.run().await
    }
}
