use crate::error::VisitError;
use crate::visitor::{self, CONSENT_SELECTORS, LINK_HARVEST_SCRIPT, PageVisit, PageVisitor};
use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder, Locator};
use std::time::Duration;
use tokio::time::{sleep, timeout};
use url::Url;

/// Extra time on top of the navigation timeout for consent handling and
/// link harvesting before a visit is abandoned wholesale
const HARVEST_GRACE: Duration = Duration::from_secs(15);

/// Delay for late-loading consent banners before probing for them
const CONSENT_SETTLE: Duration = Duration::from_millis(1000);

/// `PageVisitor` backed by a WebDriver endpoint.
///
/// Every visit opens its own session and closes it before returning; no
/// browser state is shared between concurrent workers.
pub struct WebDriverVisitor {
    endpoint: String,
    nav_timeout: Duration,
}

impl WebDriverVisitor {
    pub fn new(endpoint: &str, nav_timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            nav_timeout,
        }
    }

    async fn connect(&self) -> Result<Client, VisitError> {
        match ClientBuilder::native().connect(&self.endpoint).await {
            Ok(client) => Ok(client),
            Err(e) => Err(VisitError::Session {
                endpoint: self.endpoint.clone(),
                message: e.to_string(),
            }),
        }
    }

    async fn visit_page(&self, client: &Client, url: &str) -> Result<PageVisit, VisitError> {
        if let Err(e) = client.set_window_size(1920, 1080).await {
            ::log::debug!("failed to size window for {}: {}", url, e);
        }

        let navigation = timeout(self.nav_timeout, client.goto(url)).await;
        match navigation {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                return Err(VisitError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                });
            }
            Err(_) => {
                return Err(VisitError::Timeout {
                    url: url.to_string(),
                });
            }
        }

        dismiss_consent(client).await;

        let final_url = match client.current_url().await {
            Ok(current) => current,
            Err(_) => Url::parse(url).map_err(|e| VisitError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?,
        };

        let title = match client.title().await {
            Ok(title) if !title.trim().is_empty() => Some(title.trim().to_string()),
            _ => None,
        };

        let links = harvest_links(client, &final_url).await;

        Ok(PageVisit {
            final_url,
            title,
            links,
        })
    }
}

#[async_trait]
impl PageVisitor for WebDriverVisitor {
    async fn visit(&self, url: &str) -> Result<PageVisit, VisitError> {
        let client = self.connect().await?;

        let budget = self.nav_timeout + HARVEST_GRACE;
        let outcome = timeout(budget, self.visit_page(&client, url)).await;

        // The session is closed on every path; a leaked session would pin a
        // browser context for the rest of the crawl.
        if let Err(e) = client.close().await {
            ::log::warn!("failed to close WebDriver session for {}: {}", url, e);
        }

        match outcome {
            Ok(result) => result,
            Err(_) => Err(VisitError::Timeout {
                url: url.to_string(),
            }),
        }
    }
}

/// Best-effort dismissal of cookie/consent overlays.
///
/// Tries each known selector in order and clicks the first visible match.
/// Failing to find or click anything is tolerated silently; a consent
/// banner at worst hides some links.
async fn dismiss_consent(client: &Client) {
    sleep(CONSENT_SETTLE).await;

    for selector in CONSENT_SELECTORS {
        let element = match client.find(Locator::Css(selector)).await {
            Ok(element) => element,
            Err(_) => continue,
        };

        if !element.is_displayed().await.unwrap_or(false) {
            continue;
        }

        if element.click().await.is_ok() {
            ::log::debug!("dismissed consent overlay via {}", selector);
            // Give the banner a moment to disappear
            sleep(Duration::from_millis(500)).await;
            return;
        }

        ::log::trace!("consent click on {} failed", selector);
    }
}

/// Collect candidate links from the rendered page.
///
/// Two passes, each best-effort: a static pass over the page source, then
/// the in-page script for targets only visible to a live DOM. A failure in
/// either pass degrades to whatever the other produced.
async fn harvest_links(client: &Client, final_url: &Url) -> Vec<String> {
    let mut links = match client.source().await {
        Ok(html) => visitor::extract_links(&html, final_url),
        Err(e) => {
            ::log::debug!("failed to read source for {}: {}", final_url, e);
            Vec::new()
        }
    };

    match client.execute(LINK_HARVEST_SCRIPT, vec![]).await {
        Ok(value) => {
            if let Ok(harvested) = serde_json::from_value::<Vec<String>>(value) {
                for link in harvested {
                    if !links.contains(&link) {
                        links.push(link);
                    }
                }
            }
        }
        Err(e) => {
            ::log::debug!("script harvest failed for {}: {}", final_url, e);
        }
    }

    links
}
