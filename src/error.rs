use thiserror::Error;

/// Errors that abort a crawl.
///
/// Per-page failures never surface here; they are contained inside a single
/// worker iteration (see `VisitError`). Anything that becomes a `CrawlError`
/// propagates to the top level and stops the run.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The seed URL could not be parsed
    #[error("invalid seed URL {url:?}: {source}")]
    InvalidSeed {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The seed URL has no host to scope the crawl to
    #[error("seed URL {0:?} has no host")]
    MissingHost(String),

    /// A generalized URL still carried a query separator after
    /// normalization. Continuing would corrupt the template store with an
    /// unnormalized shape, so this is never caught.
    #[error("query separator survived normalization in {url:?}")]
    QueryLeak { url: String },

    /// Failed to read or parse a configuration file
    #[error("configuration error: {0}")]
    Config(String),

    /// A built-in classification pattern failed to compile
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// A worker task panicked or was cancelled
    #[error("worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Per-page failures, contained within one worker iteration.
#[derive(Debug, Error)]
pub enum VisitError {
    /// Could not open a WebDriver session
    #[error("failed to open WebDriver session at {endpoint}: {message}")]
    Session { endpoint: String, message: String },

    /// Navigation failed or did not settle within the timeout
    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    /// The whole visit exceeded its time budget
    #[error("visit to {url} timed out")]
    Timeout { url: String },
}
