use crate::config::CrawlConfig;
use crate::error::CrawlError;
use crate::export::CrawlReport;
use crate::filter::UrlScope;
use crate::template::TemplateStore;
use crate::template::generalize::Generalizer;
use crate::visitor::PageVisitor;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore, mpsc};
use tokio::time::timeout;
use url::Url;

/// Controller phases of a crawl.
///
/// `Draining` begins when the first worker idles past the frontier timeout;
/// the crawl keeps going until every worker has converged on an empty
/// frontier. There is no hard shutdown barrier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CrawlPhase {
    #[default]
    Idle,
    Running,
    Draining,
    Done,
}

/// A unit of frontier work. Consumed by exactly one worker and never
/// retried after being dequeued.
#[derive(Debug, Clone)]
pub struct CrawlTask {
    pub url: String,
    pub depth: u32,
}

/// All shared mutable crawl state, behind one mutex.
///
/// Template matching is a check-then-act sequence against the visited set
/// and the store, so everything lives under a single lock; no lock is ever
/// held across a suspension point.
#[derive(Debug, Default)]
pub struct CrawlState {
    pub phase: CrawlPhase,
    pub visited: HashSet<String>,
    pub templates: TemplateStore,
    pub page_titles: HashMap<String, String>,
    pub page_links: HashMap<String, Vec<String>>,
}

/// Context handed to every worker
struct Shared {
    config: CrawlConfig,
    scope: UrlScope,
    generalizer: Generalizer,
    visitor: Arc<dyn PageVisitor>,
    state: Mutex<CrawlState>,
    frontier_tx: mpsc::UnboundedSender<CrawlTask>,
    frontier_rx: Mutex<mpsc::UnboundedReceiver<CrawlTask>>,
    semaphore: Semaphore,
}

/// The site-skeleton crawler.
///
/// Owns the configuration and the visitor collaborator; [`run`] drives the
/// whole crawl and hands back a read-only [`CrawlReport`].
///
/// [`run`]: Crawler::run
pub struct Crawler {
    config: CrawlConfig,
    start_url: String,
    scope: UrlScope,
    generalizer: Generalizer,
    visitor: Arc<dyn PageVisitor>,
}

impl Crawler {
    pub fn new(config: CrawlConfig, visitor: Arc<dyn PageVisitor>) -> Result<Self, CrawlError> {
        let start_url = ensure_scheme(&config.start_url);

        let seed = Url::parse(&start_url).map_err(|source| CrawlError::InvalidSeed {
            url: start_url.clone(),
            source,
        })?;
        let host = seed
            .host_str()
            .ok_or_else(|| CrawlError::MissingHost(start_url.clone()))?;

        let scope = UrlScope::new(host)?;
        let generalizer = Generalizer::new()?;

        Ok(Self {
            config,
            start_url,
            scope,
            generalizer,
            visitor,
        })
    }

    /// Run the crawl to completion.
    ///
    /// Per-page failures are contained inside their worker iteration; only
    /// invariant violations (and task panics) surface as `Err`.
    pub async fn run(self) -> Result<CrawlReport, CrawlError> {
        let started = Instant::now();
        let start_url = self.start_url.clone();
        let domain = self.scope.domain().to_string();
        let concurrency = self.config.concurrency.max(1);

        ::log::info!("Starting crawl of {}", start_url);
        ::log::info!(
            "Max pages: {}, max depth: {}, concurrency: {}",
            self.config.max_pages,
            self.config.max_depth,
            concurrency
        );

        let (frontier_tx, frontier_rx) = mpsc::unbounded_channel::<CrawlTask>();
        frontier_tx
            .send(CrawlTask {
                url: start_url.clone(),
                depth: 0,
            })
            .unwrap();

        let shared = Arc::new(Shared {
            config: self.config,
            scope: self.scope,
            generalizer: self.generalizer,
            visitor: self.visitor,
            state: Mutex::new(CrawlState::default()),
            frontier_tx,
            frontier_rx: Mutex::new(frontier_rx),
            semaphore: Semaphore::new(concurrency),
        });

        {
            let mut state = shared.state.lock().await;
            state.phase = CrawlPhase::Running;
        }

        let mut handles = Vec::with_capacity(concurrency);
        for worker_id in 0..concurrency {
            let shared = Arc::clone(&shared);
            handles.push(tokio::spawn(worker_loop(worker_id, shared)));
        }

        // Workers converge on their own once the frontier stays empty past
        // the idle timeout; the first error wins but the rest still drain.
        let mut failure: Option<CrawlError> = None;
        for handle in handles {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => failure = failure.or(Some(e)),
                Err(join_error) => failure = failure.or(Some(CrawlError::Worker(join_error))),
            }
        }
        if let Some(error) = failure {
            return Err(error);
        }

        let mut state = {
            let mut guard = shared.state.lock().await;
            std::mem::take(&mut *guard)
        };
        state.phase = CrawlPhase::Done;

        ::log::info!(
            "Crawl done: {} pages visited, {} templates, {:.2}s",
            state.visited.len(),
            state.templates.len(),
            started.elapsed().as_secs_f64()
        );

        Ok(CrawlReport::new(domain, start_url, state, started.elapsed()))
    }
}

/// Default the scheme to https for bare hostnames
pub(crate) fn ensure_scheme(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

/// Worker that processes frontier tasks until its pop times out
async fn worker_loop(worker_id: usize, shared: Arc<Shared>) -> Result<(), CrawlError> {
    ::log::debug!("worker {} starting", worker_id);

    loop {
        let task = {
            let mut rx = shared.frontier_rx.lock().await;
            let idle = Duration::from_secs(shared.config.frontier_idle_secs);
            match timeout(idle, rx.recv()).await {
                Ok(Some(task)) => task,
                Ok(None) => break,
                Err(_) => {
                    ::log::debug!("worker {} idled past {:?}", worker_id, idle);
                    break;
                }
            }
        };

        let _permit = shared.semaphore.acquire().await.unwrap();
        process_task(worker_id, &shared, task).await?;
    }

    {
        let mut state = shared.state.lock().await;
        if state.phase == CrawlPhase::Running {
            state.phase = CrawlPhase::Draining;
            ::log::info!("frontier empty for worker {}, crawl draining", worker_id);
        }
    }

    ::log::debug!("worker {} exiting", worker_id);
    Ok(())
}

/// One worker iteration: claim the URL, visit it, and feed every candidate
/// link through the filter → generalizer → template matcher chain
async fn process_task(worker_id: usize, shared: &Shared, task: CrawlTask) -> Result<(), CrawlError> {
    // Claim before fetching so a racing worker skips this URL; also the
    // budget short-circuit for queued-but-unpopped items.
    {
        let mut state = shared.state.lock().await;
        if state.visited.contains(&task.url) || state.visited.len() >= shared.config.max_pages {
            return Ok(());
        }
        state.visited.insert(task.url.clone());
    }

    ::log::debug!(
        "worker {} visiting {} at depth {}",
        worker_id,
        task.url,
        task.depth
    );

    let visit = match shared.visitor.visit(&task.url).await {
        Ok(visit) => visit,
        Err(e) => {
            // Contained: the page stays visited, with no links.
            ::log::warn!("Error crawling {}: {}", task.url, e);
            let mut state = shared.state.lock().await;
            state.page_links.insert(task.url.clone(), Vec::new());
            return Ok(());
        }
    };

    let mut admitted = Vec::new();
    for raw in &visit.links {
        let Some(url) = shared.scope.admit(raw) else {
            continue;
        };

        let generalized = shared.generalizer.generalize_url(url.as_str());
        if generalized.contains('?') {
            // Never let an unnormalized shape reach the template store.
            return Err(CrawlError::QueryLeak { url: generalized });
        }
        admitted.push(generalized);
    }

    let mut novel = Vec::new();
    {
        let mut state = shared.state.lock().await;

        if let Some(title) = &visit.title {
            state.page_titles.insert(task.url.clone(), title.clone());
        }

        for generalized in admitted {
            if state.visited.contains(&generalized) {
                continue;
            }
            if state.templates.match_url(&generalized).is_some() {
                // Known shape; the matching template absorbed the value.
                continue;
            }

            state.templates.insert(&generalized);

            let child_depth = task.depth + 1;
            if child_depth <= shared.config.max_depth
                && state.visited.len() < shared.config.max_pages
            {
                let _ = shared.frontier_tx.send(CrawlTask {
                    url: generalized.clone(),
                    depth: child_depth,
                });
            }

            novel.push(generalized);
        }

        state.page_links.insert(task.url.clone(), novel.clone());

        ::log::info!(
            "Crawled: {} ({}/{}) - {} new links, {} templates so far",
            task.url,
            state.visited.len(),
            shared.config.max_pages,
            novel.len(),
            state.templates.len()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VisitError;
    use crate::visitor::{PageVisit, PageVisitor};
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    /// Visitor that serves a programmable link graph and counts visits
    struct StubVisitor {
        visits: StdMutex<HashMap<String, usize>>,
        links_for: Box<dyn Fn(&str) -> Vec<String> + Send + Sync>,
        fail_on: Option<String>,
    }

    impl StubVisitor {
        fn new(links_for: impl Fn(&str) -> Vec<String> + Send + Sync + 'static) -> Self {
            Self {
                visits: StdMutex::new(HashMap::new()),
                links_for: Box::new(links_for),
                fail_on: None,
            }
        }

        fn visit_counts(&self) -> HashMap<String, usize> {
            self.visits.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageVisitor for StubVisitor {
        async fn visit(&self, url: &str) -> Result<PageVisit, VisitError> {
            *self
                .visits
                .lock()
                .unwrap()
                .entry(url.to_string())
                .or_insert(0) += 1;

            if self.fail_on.as_deref() == Some(url) {
                return Err(VisitError::Timeout {
                    url: url.to_string(),
                });
            }

            Ok(PageVisit {
                final_url: Url::parse(url).unwrap(),
                title: Some("Stub Page".to_string()),
                links: (self.links_for)(url),
            })
        }
    }

    fn test_config(start_url: &str, max_pages: usize, max_depth: u32) -> CrawlConfig {
        let mut config = CrawlConfig::new(start_url);
        config.max_pages = max_pages;
        config.max_depth = max_depth;
        config.concurrency = 3;
        config.frontier_idle_secs = 1;
        config
    }

    #[test]
    fn test_ensure_scheme() {
        assert_eq!(ensure_scheme("arxiv.org"), "https://arxiv.org");
        assert_eq!(ensure_scheme("http://a.test"), "http://a.test");
        assert_eq!(ensure_scheme("https://a.test"), "https://a.test");
    }

    #[tokio::test]
    async fn test_infinite_graph_respects_page_budget() {
        // Every page links to two ever-deeper children: an unbounded graph.
        let visitor = Arc::new(StubVisitor::new(|url| {
            vec![
                format!("{}/alpha-node", url),
                format!("{}/beta-node", url),
            ]
        }));

        let config = test_config("https://site.test/start", 5, 1000);
        let report = Crawler::new(config, visitor.clone()).unwrap().run().await.unwrap();

        assert!(report.visited().len() <= 5);
        assert!(!report.visited().is_empty());
    }

    #[tokio::test]
    async fn test_cyclic_graph_visits_each_url_once() {
        let visitor = Arc::new(StubVisitor::new(|url| {
            if url.ends_with("/ring-one") {
                vec!["https://site.test/ring-one/ring-two".to_string()]
            } else {
                vec!["https://site.test/ring-one".to_string()]
            }
        }));

        let config = test_config("https://site.test/ring-one", 50, 10);
        let report = Crawler::new(config, visitor.clone()).unwrap().run().await.unwrap();

        for (url, count) in visitor.visit_counts() {
            assert_eq!(count, 1, "{} visited more than once", url);
        }
        assert_eq!(report.visited().len(), 2);
    }

    #[tokio::test]
    async fn test_assets_and_off_domain_links_never_enter_state() {
        let visitor = Arc::new(StubVisitor::new(|url| {
            if url.ends_with("/start") {
                vec![
                    "https://site.test/style.css".to_string(),
                    "https://site.test/static/page".to_string(),
                    "https://otherdomain.com/page".to_string(),
                    "https://idp.site.test/sso-page".to_string(),
                ]
            } else {
                Vec::new()
            }
        }));

        let config = test_config("https://site.test/start", 10, 10);
        let report = Crawler::new(config, visitor).unwrap().run().await.unwrap();

        assert!(report.visited().contains("https://idp.site.test/sso-page"));
        for url in report.visited() {
            assert!(!url.contains(".css"));
            assert!(!url.contains("/static/"));
            assert!(!url.contains("otherdomain.com"));
        }
        for template in report.templates() {
            for segment in &template.segments {
                if let crate::template::Segment::Fixed { example } = segment {
                    assert_ne!(example, "otherdomain.com");
                    assert_ne!(example, "style.css");
                }
            }
        }
    }

    #[tokio::test]
    async fn test_max_depth_caps_the_chain() {
        let visitor = Arc::new(StubVisitor::new(|url| {
            vec![format!("{}/deep-layer", url)]
        }));

        let config = test_config("https://site.test/start", 100, 2);
        let report = Crawler::new(config, visitor).unwrap().run().await.unwrap();

        // Seed at depth 0 plus two generations of children.
        assert_eq!(report.visited().len(), 3);
        assert!(
            report
                .visited()
                .contains("https://site.test/start/deep-layer/deep-layer")
        );
    }

    #[tokio::test]
    async fn test_page_failure_is_contained() {
        let mut visitor = StubVisitor::new(|url| {
            if url.ends_with("/start") {
                vec![
                    "https://site.test/fail-page".to_string(),
                    "https://site.test/good-page/sub-page".to_string(),
                ]
            } else {
                Vec::new()
            }
        });
        visitor.fail_on = Some("https://site.test/fail-page".to_string());
        let visitor = Arc::new(visitor);

        let config = test_config("https://site.test/start", 10, 10);
        let report = Crawler::new(config, visitor).unwrap().run().await.unwrap();

        assert_eq!(report.visited().len(), 3);
        assert!(report.visited().contains("https://site.test/fail-page"));
        assert_eq!(
            report.page_links()["https://site.test/fail-page"],
            Vec::<String>::new()
        );
    }

    #[tokio::test]
    async fn test_scheme_defaulted_seed_is_crawled() {
        let visitor = Arc::new(StubVisitor::new(|_| Vec::new()));
        let config = test_config("site.test/start", 10, 10);
        let report = Crawler::new(config, visitor).unwrap().run().await.unwrap();

        assert!(report.visited().contains("https://site.test/start"));
        assert_eq!(report.start_url(), "https://site.test/start");
    }
}
