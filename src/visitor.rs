use crate::error::VisitError;
use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Everything a single page visit produced
#[derive(Debug, Clone)]
pub struct PageVisit {
    /// The page's final URL after redirects
    pub final_url: Url,

    /// The page title, when one could be read
    pub title: Option<String>,

    /// Raw candidate links, already resolved to absolute URLs
    pub links: Vec<String>,
}

/// The browser collaborator seam.
///
/// Anything that can render a URL and hand back the candidate links found on
/// the page is substitutable here; the crawler itself never talks to a
/// browser directly. The production implementation is
/// [`WebDriverVisitor`](crate::browser::WebDriverVisitor).
#[async_trait]
pub trait PageVisitor: Send + Sync {
    /// Render one URL in an isolated browsing context and extract candidate
    /// links. Implementations return partial results rather than failing
    /// where they can; an `Err` means nothing useful was extracted.
    async fn visit(&self, url: &str) -> Result<PageVisit, VisitError>;
}

/// Consent-dismissal selectors, tried in order; the first visible match is
/// clicked. CSS-only, since text-matching pseudo-selectors are not part of
/// WebDriver's selector support.
pub const CONSENT_SELECTORS: [&str; 12] = [
    "[data-cc-action=\"accept\"]",
    "[data-action=\"accept\"]",
    "button[id*=\"accept\"]",
    "button[class*=\"accept\"]",
    ".cc-banner__button-accept",
    "#onetrust-accept-btn-handler",
    "#hs-eu-confirmation-button",
    ".osano-cm-accept-all",
    ".cookie-consent-accept",
    ".gdpr-accept",
    "[aria-label*=\"Accept\"]",
    "[title*=\"Accept\"]",
];

/// In-page script that collects navigation targets the static pass cannot
/// see once scripts have run: anchors added dynamically, `onclick`
/// handlers, data attributes, and SPA router links. Resolves everything
/// against the live location and returns an array of absolute URLs.
pub const LINK_HARVEST_SCRIPT: &str = r#"
    const links = new Set();
    document.querySelectorAll('a[href]').forEach(a => {
        links.add(a.href);
    });
    document.querySelectorAll('[onclick], [data-href], [data-url]').forEach(el => {
        const onclick = el.getAttribute('onclick');
        if (onclick) {
            const match = onclick.match(/(?:location\.href|window\.location|navigate)\s*=\s*['"]([^'"]+)['"]/);
            if (match) links.add(new URL(match[1], window.location.href).href);
        }
        const dataHref = el.getAttribute('data-href') || el.getAttribute('data-url');
        if (dataHref) links.add(new URL(dataHref, window.location.href).href);
    });
    document.querySelectorAll('[to], [href^="/"], [href^="./"], [href^="../"]').forEach(el => {
        const href = el.getAttribute('to') || el.getAttribute('href');
        if (href) links.add(new URL(href, window.location.href).href);
    });
    return Array.from(links);
"#;

/// Static link pass over rendered page source.
///
/// Pulls candidates from anchor `href`s, `data-href`/`data-url` attributes,
/// SPA-router `to` attributes, and navigation targets embedded in inline
/// `onclick` handlers, resolving each against the page's final URL.
pub fn extract_links(html: &str, base: &Url) -> Vec<String> {
    let doc = Html::parse_document(html);

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    let mut push = |candidate: &str| {
        if let Ok(resolved) = base.join(candidate) {
            let absolute = resolved.to_string();
            if seen.insert(absolute.clone()) {
                links.push(absolute);
            }
        }
    };

    let anchor = Selector::parse("a[href]").unwrap();
    for element in doc.select(&anchor) {
        if let Some(href) = element.value().attr("href") {
            push(href);
        }
    }

    for (selector_text, attribute) in [("[data-href]", "data-href"), ("[data-url]", "data-url")] {
        let selector = Selector::parse(selector_text).unwrap();
        for element in doc.select(&selector) {
            if let Some(target) = element.value().attr(attribute) {
                push(target);
            }
        }
    }

    // Router-style links (React, Vue, etc)
    let router = Selector::parse("[to]").unwrap();
    for element in doc.select(&router) {
        if let Some(target) = element.value().attr("to") {
            push(target);
        }
    }

    // Navigation targets assigned inside inline onclick handlers
    if let Ok(navigation) =
        Regex::new(r#"(?:location\.href|window\.location|navigate)\s*=\s*['"]([^'"]+)['"]"#)
    {
        let onclick = Selector::parse("[onclick]").unwrap();
        for element in doc.select(&onclick) {
            if let Some(script) = element.value().attr("onclick") {
                if let Some(captures) = navigation.captures(script) {
                    push(&captures[1]);
                }
            }
        }
    }

    ::log::debug!("static pass found {} links", links.len());
    links
}
