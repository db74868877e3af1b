use regex::Regex;
use url::Url;

/// Path components that mark a URL as a static asset
const STATIC_PATH_COMPONENTS: [&str; 7] = [
    "/static/", "/assets/", "/css/", "/js/", "/images/", "/img/", "/fonts/",
];

/// Decides which discovered URLs stay in the crawl.
///
/// A scope is fixed by the seed's host: it accepts the same host, its
/// subdomains, and `www.` variants, and rejects static assets. Accepted URLs
/// come back normalized, with fragment and query stripped, since query-based
/// routing is not modeled.
#[derive(Debug)]
pub struct UrlScope {
    domain: String,
    asset_extension: Regex,
}

impl UrlScope {
    /// Create a scope anchored to the given host
    pub fn new(domain: &str) -> Result<Self, regex::Error> {
        let asset_extension = Regex::new(
            r"\.(css|js|png|jpg|jpeg|gif|svg|ico|pdf|zip|tar|gz|mp4|mp3|webm|woff|woff2|ttf|eot|xml|json|txt|webmanifest)$",
        )?;

        Ok(Self {
            domain: domain.to_string(),
            asset_extension,
        })
    }

    /// The host this scope is anchored to
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Run a raw candidate link through the full filter chain.
    ///
    /// Returns the normalized URL if it survives, `None` if it was dropped
    /// (malformed, off-domain, or a static asset).
    pub fn admit(&self, raw: &str) -> Option<Url> {
        let parsed = Url::parse(raw).ok()?;

        let host = parsed.host_str()?;
        if !self.in_scope(host) {
            return None;
        }

        let normalized = normalize_url(&parsed);
        if self.is_static_asset(&normalized) {
            return None;
        }

        Some(normalized)
    }

    /// Check whether a host is the scope domain, one of its subdomains, or a
    /// `www.` variant of it
    pub fn in_scope(&self, host: &str) -> bool {
        if host == self.domain {
            return true;
        }

        // Subdomains, e.g. idp.example.com when crawling example.com
        if host.ends_with(&format!(".{}", self.domain)) {
            return true;
        }

        // www variations in either direction
        if let Some(stripped) = host.strip_prefix("www.") {
            if stripped == self.domain {
                return true;
            }
        }
        if let Some(stripped) = self.domain.strip_prefix("www.") {
            if host == stripped {
                return true;
            }
        }

        false
    }

    /// Check whether a URL points at a static asset that should not be
    /// crawled
    pub fn is_static_asset(&self, url: &Url) -> bool {
        let path = url.path().to_lowercase();

        if self.asset_extension.is_match(&path) {
            return true;
        }

        STATIC_PATH_COMPONENTS
            .iter()
            .any(|component| path.contains(component))
    }
}

/// Strip the fragment and query string from a URL
pub fn normalize_url(url: &Url) -> Url {
    let mut normalized = url.clone();
    normalized.set_fragment(None);
    normalized.set_query(None);
    normalized
}
