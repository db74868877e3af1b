use crate::crawler::CrawlState;
use crate::template::{Segment, Template};
use serde::Serialize;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;

/// How many example values a Variable segment shows in the tree export
const TREE_EXAMPLE_LIMIT: usize = 3;

/// Output formats for a finished crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Indented text tree of template path shapes
    Tree,
    /// Full JSON dump with statistics and per-URL link lists
    Json,
    /// Sorted newline-separated list of visited URLs
    Urls,
    /// XML sitemap of visited URLs
    Sitemap,
}

/// Aggregate statistics over a finished crawl
#[derive(Debug, Clone, Serialize)]
pub struct CrawlStats {
    pub pages_crawled: usize,
    pub total_links_found: usize,
    pub pages_with_most_links: Vec<(String, usize)>,
    pub depth_distribution: BTreeMap<u32, usize>,
}

/// Read-only view of everything a crawl discovered.
///
/// Produced once the pool has converged; the underlying visited set and
/// template list no longer change.
#[derive(Debug)]
pub struct CrawlReport {
    domain: String,
    start_url: String,
    visited: BTreeSet<String>,
    templates: Vec<Template>,
    page_titles: HashMap<String, String>,
    page_links: HashMap<String, Vec<String>>,
    elapsed: Duration,
}

impl CrawlReport {
    pub(crate) fn new(
        domain: String,
        start_url: String,
        state: CrawlState,
        elapsed: Duration,
    ) -> Self {
        Self {
            domain,
            start_url,
            visited: state.visited.into_iter().collect(),
            templates: state.templates.into_templates(),
            page_titles: state.page_titles,
            page_links: state.page_links,
            elapsed,
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn start_url(&self) -> &str {
        &self.start_url
    }

    pub fn visited(&self) -> &BTreeSet<String> {
        &self.visited
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn page_titles(&self) -> &HashMap<String, String> {
        &self.page_titles
    }

    pub fn page_links(&self) -> &HashMap<String, Vec<String>> {
        &self.page_links
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Compute aggregate statistics from the visited set and page records
    pub fn statistics(&self) -> CrawlStats {
        let total_links_found = self.page_links.values().map(Vec::len).sum();

        let mut pages_by_links: Vec<(String, usize)> = self
            .page_links
            .iter()
            .map(|(url, links)| (url.clone(), links.len()))
            .collect();
        pages_by_links.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        pages_by_links.truncate(10);

        let mut depth_distribution = BTreeMap::new();
        for url in &self.visited {
            *depth_distribution.entry(path_depth(url)).or_insert(0) += 1;
        }

        CrawlStats {
            pages_crawled: self.visited.len(),
            total_links_found,
            pages_with_most_links: pages_by_links,
            depth_distribution,
        }
    }

    /// Render the crawl in the requested format
    pub fn export(&self, format: ExportFormat) -> String {
        match format {
            ExportFormat::Tree => self.export_tree(),
            ExportFormat::Json => self.export_json(),
            ExportFormat::Urls => self.export_urls(),
            ExportFormat::Sitemap => self.export_sitemap(),
        }
    }

    /// Text tree of template path shapes; Variable segments show a few
    /// example values
    fn export_tree(&self) -> String {
        let mut result = Vec::new();
        result.push(format!("Site Structure for {}", self.domain));
        result.push("=".repeat(50));
        result.push(String::new());

        let mut seen = BTreeSet::new();
        for template in &self.templates {
            let path = render_template_path(template);
            if !path.is_empty() {
                seen.insert(path);
            }
        }

        let mut paths: Vec<String> = seen.into_iter().collect();
        paths.sort_by_key(|path| (path.matches('/').count(), path.clone()));

        let count = paths.len();
        for (index, path) in paths.into_iter().enumerate() {
            let branch = if index + 1 == count { "└──" } else { "├──" };
            result.push(format!("{} {} - Template Pattern", branch, path));
        }

        result.join("\n")
    }

    /// JSON dump: domain, seed, statistics, and per-URL titles and links
    fn export_json(&self) -> String {
        let mut structure = serde_json::Map::new();
        for url in &self.visited {
            structure.insert(
                url.clone(),
                json!({
                    "title": self.page_titles.get(url).cloned().unwrap_or_default(),
                    "links": self.page_links.get(url).cloned().unwrap_or_default(),
                }),
            );
        }

        let value = json!({
            "domain": self.domain,
            "start_url": self.start_url,
            "pages_crawled": self.visited.len(),
            "statistics": self.statistics(),
            "structure": structure,
        });

        serde_json::to_string_pretty(&value).unwrap_or_default()
    }

    /// Plain sorted URL list
    fn export_urls(&self) -> String {
        self.visited.iter().cloned().collect::<Vec<_>>().join("\n")
    }

    /// XML sitemap of visited URLs
    fn export_sitemap(&self) -> String {
        let mut result = vec![
            r#"<?xml version="1.0" encoding="UTF-8"?>"#.to_string(),
            r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#.to_string(),
        ];

        for url in &self.visited {
            result.push("  <url>".to_string());
            result.push(format!("    <loc>{}</loc>", url));
            result.push("  </url>".to_string());
        }

        result.push("</urlset>".to_string());
        result.join("\n")
    }
}

/// Render one template as a path string, hiding the scheme token
fn render_template_path(template: &Template) -> String {
    let mut path = String::new();

    for segment in &template.segments {
        match segment {
            Segment::Fixed { example } => {
                if example != "https:" && example != "http:" {
                    path.push_str(example);
                    path.push('/');
                }
            }
            Segment::Variable { examples } => {
                let shown: Vec<&str> = examples
                    .iter()
                    .take(TREE_EXAMPLE_LIMIT)
                    .map(String::as_str)
                    .collect();
                path.push('[');
                path.push_str(&shown.join("|"));
                if examples.len() > TREE_EXAMPLE_LIMIT {
                    path.push_str("|...");
                }
                path.push_str("]/");
            }
        }
    }

    path
}

/// Number of slashes in a URL's path, as a rough depth measure
fn path_depth(url: &str) -> u32 {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    match rest.find('/') {
        Some(index) => rest[index..].matches('/').count() as u32,
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::CrawlState;
    use crate::template::TemplateStore;

    fn sample_report() -> CrawlReport {
        let mut templates = TemplateStore::new();
        templates.insert("https://site.test/docs/intro");
        templates.match_url("https://site.test/docs/setup");
        templates.match_url("https://site.test/docs/usage");
        templates.match_url("https://site.test/docs/faq");
        templates.insert("https://site.test/about-page");

        let mut state = CrawlState {
            templates,
            ..CrawlState::default()
        };

        for url in [
            "https://site.test/docs/intro",
            "https://site.test/about-page",
            "https://site.test/start",
        ] {
            state.visited.insert(url.to_string());
        }

        state
            .page_titles
            .insert("https://site.test/start".to_string(), "Start".to_string());
        state.page_links.insert(
            "https://site.test/start".to_string(),
            vec![
                "https://site.test/docs/intro".to_string(),
                "https://site.test/about-page".to_string(),
            ],
        );
        state
            .page_links
            .insert("https://site.test/about-page".to_string(), Vec::new());

        CrawlReport::new(
            "site.test".to_string(),
            "https://site.test/start".to_string(),
            state,
            Duration::from_secs(2),
        )
    }

    #[test]
    fn test_tree_shows_examples_with_ellipsis() {
        let report = sample_report();
        let tree = report.export(ExportFormat::Tree);

        assert!(tree.starts_with("Site Structure for site.test"));
        // Four observed values, only three shown.
        assert!(tree.contains("site.test/docs/[faq|intro|setup|...]/"));
        assert!(tree.contains("site.test/about-page/"));
        assert!(!tree.contains("https:"));
    }

    #[test]
    fn test_urls_export_is_sorted() {
        let report = sample_report();
        let urls = report.export(ExportFormat::Urls);
        let lines: Vec<&str> = urls.lines().collect();

        let mut sorted = lines.clone();
        sorted.sort();
        assert_eq!(lines, sorted);
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_sitemap_wraps_every_visited_url() {
        let report = sample_report();
        let sitemap = report.export(ExportFormat::Sitemap);

        assert!(sitemap.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(sitemap.contains("<loc>https://site.test/start</loc>"));
        assert_eq!(sitemap.matches("<url>").count(), 3);
        assert!(sitemap.ends_with("</urlset>"));
    }

    #[test]
    fn test_json_export_structure() {
        let report = sample_report();
        let value: serde_json::Value = serde_json::from_str(&report.export(ExportFormat::Json)).unwrap();

        assert_eq!(value["domain"], "site.test");
        assert_eq!(value["pages_crawled"], 3);
        assert_eq!(value["structure"]["https://site.test/start"]["title"], "Start");
        assert_eq!(
            value["structure"]["https://site.test/start"]["links"]
                .as_array()
                .unwrap()
                .len(),
            2
        );
    }

    #[test]
    fn test_statistics() {
        let report = sample_report();
        let stats = report.statistics();

        assert_eq!(stats.pages_crawled, 3);
        assert_eq!(stats.total_links_found, 2);
        assert_eq!(
            stats.pages_with_most_links[0],
            ("https://site.test/start".to_string(), 2)
        );
        // /start and /about-page sit at depth 1, /docs/intro at depth 2.
        assert_eq!(stats.depth_distribution[&1], 2);
        assert_eq!(stats.depth_distribution[&2], 1);
    }

    #[test]
    fn test_path_depth() {
        assert_eq!(path_depth("https://site.test"), 0);
        assert_eq!(path_depth("https://site.test/a"), 1);
        assert_eq!(path_depth("https://site.test/a/b/"), 3);
    }
}
