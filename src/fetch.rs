//! Page retrieval and the batched fetch scheduler.
//!
//! # Architecture
//!
//! - [`Fetcher`]: async capability turning a URL into markup
//! - [`HttpFetcher`]: the production implementation on top of `reqwest`
//! - [`fetch_all`]: schedules many URLs over a [`Fetcher`] in blocks
//!
//! # Scheduling
//!
//! URLs already known to the dedup store are dropped before anything is
//! requested. The rest are cut into blocks of `block_size`; blocks run one
//! after another and the URLs inside a block are requested concurrently. The
//! next block starts only after every request of the current one settled, so
//! at most `block_size` connections to the site are open at any time.
//!
//! A failed request is logged and left out of the result. Nothing is retried
//! within a run; the URL is simply picked up again by the next run.

use crate::error::{CrawlError, Result};
use crate::models::FetchedPage;
use crate::notifier::Notifier;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use reqwest::Client;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Trait for retrieving the markup behind a URL.
///
/// Implementations must fail on network errors, non-success statuses and
/// empty bodies so the scheduler can treat all of them the same way.
pub trait Fetcher {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// [`Fetcher`] backed by a shared `reqwest` client.
///
/// The request timeout lives here rather than in the scheduler.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| CrawlError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String> {
        let t0 = Instant::now();
        let http_err = |source| CrawlError::Http {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(http_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(CrawlError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(http_err)?;
        if body.trim().is_empty() {
            return Err(CrawlError::EmptyBody {
                url: url.to_string(),
            });
        }

        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched page"
        );
        Ok(body)
    }
}

/// Split the URLs that still need fetching into scheduling blocks.
///
/// URLs in `already_seen` and repeated URLs are dropped first. Blocks keep
/// input order and every remaining URL lands in exactly one of them. A
/// `block_size` of zero is treated as one.
pub fn plan_blocks(
    urls: &[String],
    already_seen: &HashSet<String>,
    block_size: usize,
) -> Vec<Vec<String>> {
    let pending: Vec<String> = urls
        .iter()
        .filter(|url| !already_seen.contains(url.as_str()))
        .unique()
        .cloned()
        .collect();

    pending
        .chunks(block_size.max(1))
        .map(|block| block.to_vec())
        .collect()
}

/// Fetch every URL not in `already_seen`, block by block.
///
/// Output keeps block order; inside a block pages appear in the order their
/// requests settled. Failed URLs are omitted, so an empty result is possible
/// and never an error.
#[instrument(level = "info", skip_all, fields(urls = urls.len(), seen = already_seen.len(), block_size = block_size))]
pub async fn fetch_all<F: Fetcher>(
    fetcher: &F,
    urls: &[String],
    already_seen: &HashSet<String>,
    block_size: usize,
    notifier: &Notifier,
) -> Vec<FetchedPage> {
    let blocks = plan_blocks(urls, already_seen, block_size);
    let total_blocks = blocks.len();
    let scheduled: usize = blocks.iter().map(Vec::len).sum();
    info!(
        scheduled,
        skipped = urls.len() - scheduled,
        blocks = total_blocks,
        "Planned fetch blocks"
    );

    let mut pages = Vec::with_capacity(scheduled);
    for (index, block) in blocks.iter().enumerate() {
        notifier.say(&format!(
            "block {}/{}: requesting {} links",
            index + 1,
            total_blocks,
            block.len()
        ));

        let settled: Vec<Option<FetchedPage>> = stream::iter(block)
            .map(|url| fetch_one(fetcher, url))
            .buffer_unordered(block.len())
            .collect()
            .await;

        let fetched = settled.iter().filter(|p| p.is_some()).count();
        pages.extend(settled.into_iter().flatten());
        notifier.say(&format!(
            "block {}/{} done: {} fetched, {} failed",
            index + 1,
            total_blocks,
            fetched,
            block.len() - fetched
        ));
    }

    info!(fetched = pages.len(), scheduled, "Fetched article pages");
    pages
}

async fn fetch_one<F: Fetcher>(fetcher: &F, url: &str) -> Option<FetchedPage> {
    match fetcher.fetch(url).await {
        Ok(markup) => Some(FetchedPage {
            url: url.to_string(),
            markup,
        }),
        Err(e) => {
            warn!(%url, error = %e, "Fetch failed; will retry on next run");
            None
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Lifecycle of one request as seen by [`ScriptedFetcher`].
    #[derive(Debug, Clone)]
    pub struct Call {
        pub url: String,
        pub started: usize,
        pub settled: usize,
    }

    /// In-memory fetcher serving canned pages with small, uneven delays.
    ///
    /// URLs without a page fail. Every request is recorded with logical
    /// start/settle ticks, and the peak number of requests in flight is kept.
    #[derive(Debug, Default)]
    pub struct ScriptedFetcher {
        pages: HashMap<String, String>,
        clock: AtomicUsize,
        in_flight: AtomicUsize,
        peak_in_flight: AtomicUsize,
        calls: Mutex<Vec<Call>>,
    }

    impl ScriptedFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_page(mut self, url: &str, markup: &str) -> Self {
            self.pages.insert(url.to_string(), markup.to_string());
            self
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        pub fn requested(&self) -> Vec<String> {
            self.calls().into_iter().map(|c| c.url).collect()
        }

        pub fn peak_in_flight(&self) -> usize {
            self.peak_in_flight.load(Ordering::SeqCst)
        }
    }

    impl Fetcher for ScriptedFetcher {
        async fn fetch(&self, url: &str) -> Result<String> {
            let started = self.clock.fetch_add(1, Ordering::SeqCst);
            let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

            let delay = 1 + (url.len() * 7 + started * 3) % 5;
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            let settled = self.clock.fetch_add(1, Ordering::SeqCst);
            self.calls.lock().unwrap().push(Call {
                url: url.to_string(),
                started,
                settled,
            });

            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| CrawlError::Status {
                    url: url.to_string(),
                    status: 404,
                })
        }
    }

    fn urls(n: usize) -> Vec<String> {
        (0..n)
            .map(|i| format!("https://www.cosmo.ru/news/{i}/"))
            .collect()
    }

    fn serving(urls: &[String]) -> ScriptedFetcher {
        urls.iter()
            .fold(ScriptedFetcher::new(), |f, u| f.with_page(u, "<html></html>"))
    }

    #[test]
    fn test_plan_25_urls_into_20_and_5() {
        let blocks = plan_blocks(&urls(25), &HashSet::new(), 20);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].len(), 20);
        assert_eq!(blocks[1].len(), 5);
        assert_eq!(blocks.concat(), urls(25));
    }

    #[test]
    fn test_plan_drops_seen_and_duplicates() {
        let mut input = urls(4);
        input.push(input[1].clone());
        let seen: HashSet<String> = [input[0].clone(), input[2].clone()].into();

        let blocks = plan_blocks(&input, &seen, 20);
        assert_eq!(blocks, vec![vec![input[1].clone(), input[3].clone()]]);
    }

    #[test]
    fn test_plan_zero_block_size_means_one() {
        let blocks = plan_blocks(&urls(3), &HashSet::new(), 0);
        assert_eq!(blocks.len(), 3);
    }

    #[test]
    fn test_plan_empty() {
        assert!(plan_blocks(&[], &HashSet::new(), 20).is_empty());
    }

    #[tokio::test]
    async fn test_blocks_run_strictly_one_after_another() {
        let input = urls(25);
        let fetcher = serving(&input);
        let notifier = Notifier::start();

        let pages = fetch_all(&fetcher, &input, &HashSet::new(), 20, &notifier).await;
        assert_eq!(pages.len(), 25);

        let calls = fetcher.calls();
        let block_of = |url: &str| input.iter().position(|u| u == url).unwrap() / 20;
        let last_settle_first = calls
            .iter()
            .filter(|c| block_of(&c.url) == 0)
            .map(|c| c.settled)
            .max()
            .unwrap();
        let first_start_second = calls
            .iter()
            .filter(|c| block_of(&c.url) == 1)
            .map(|c| c.started)
            .min()
            .unwrap();
        assert!(last_settle_first < first_start_second);

        // the first block really ran concurrently, and never exceeded its bound
        assert_eq!(fetcher.peak_in_flight(), 20);

        // block order is preserved in the output
        let first_block: HashSet<&str> = input[..20].iter().map(String::as_str).collect();
        assert!(pages[..20].iter().all(|p| first_block.contains(p.url.as_str())));
    }

    #[tokio::test]
    async fn test_never_requests_seen_urls() {
        let input = urls(10);
        let fetcher = serving(&input);
        let seen: HashSet<String> = input[..6].iter().cloned().collect();

        let pages = fetch_all(&fetcher, &input, &seen, 3, &Notifier::start()).await;

        assert_eq!(pages.len(), 4);
        for url in fetcher.requested() {
            assert!(!seen.contains(&url), "requested seen url {url}");
        }
    }

    #[tokio::test]
    async fn test_failures_are_omitted() {
        let input = urls(5);
        let fetcher = serving(&input[..2]);

        let pages = fetch_all(&fetcher, &input, &HashSet::new(), 2, &Notifier::start()).await;

        let mut got: Vec<String> = pages.into_iter().map(|p| p.url).collect();
        got.sort();
        let mut want = input[..2].to_vec();
        want.sort();
        assert_eq!(got, want);
        assert_eq!(fetcher.requested().len(), 5);
    }

    #[tokio::test]
    async fn test_total_failure_is_empty() {
        let input = urls(3);
        let fetcher = ScriptedFetcher::new();
        let pages = fetch_all(&fetcher, &input, &HashSet::new(), 20, &Notifier::start()).await;
        assert!(pages.is_empty());
    }

    /// Serve one raw HTTP response on a local port and return its URL.
    async fn serve_once(response: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });
        format!("http://{addr}/news/1/")
    }

    fn http() -> HttpFetcher {
        HttpFetcher::new(Duration::from_secs(5), "cosmo_stars-test").unwrap()
    }

    #[tokio::test]
    async fn test_http_fetcher_returns_body() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 11\r\nConnection: close\r\n\r\n<p>star</p>",
        )
        .await;
        assert_eq!(http().fetch(&url).await.unwrap(), "<p>star</p>");
    }

    #[tokio::test]
    async fn test_http_fetcher_rejects_error_status() {
        let url = serve_once(
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;
        let err = http().fetch(&url).await.unwrap_err();
        assert!(matches!(err, CrawlError::Status { status: 500, .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_http_fetcher_rejects_blank_body() {
        let url =
            serve_once("HTTP/1.1 200 OK\r\nContent-Length: 3\r\nConnection: close\r\n\r\n \n\t")
                .await;
        let err = http().fetch(&url).await.unwrap_err();
        assert!(matches!(err, CrawlError::EmptyBody { .. }), "{err:?}");
    }
}
