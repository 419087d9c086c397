use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use product_scrap::{
    CodeFormat, CrawlConfig, Crawler, Error, PageFetcher, PageResponse, Result, StopReason,
};
use tokio::time::Instant;

const BASE: &str = "https://shop.example.com/search";

#[derive(Debug, Clone)]
enum Reply {
    Tiles(Vec<&'static str>),
    Status(u16),
    Transport,
}

/// A fake listing: every page answers with its queued replies in order, then 404.
#[derive(Default)]
struct Listing {
    pages: Mutex<HashMap<u32, VecDeque<Reply>>>,
    requests: Mutex<Vec<(u32, String, Instant)>>,
}

impl Listing {
    fn page(self, page: u32, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.pages
            .lock()
            .unwrap()
            .entry(page)
            .or_default()
            .extend(replies);
        self
    }

    fn requested_pages(&self) -> Vec<u32> {
        self.requests.lock().unwrap().iter().map(|(p, _, _)| *p).collect()
    }

    fn request_times(&self) -> Vec<Instant> {
        self.requests.lock().unwrap().iter().map(|(_, _, t)| *t).collect()
    }

    fn urls(&self) -> Vec<String> {
        self.requests.lock().unwrap().iter().map(|(_, u, _)| u.clone()).collect()
    }
}

fn tiles_html(codes: &[&str]) -> String {
    let tiles = codes
        .iter()
        .map(|code| {
            format!(
                r#"<div class="Hit_hit__k2"><a class="Hit_hitImageLink__p9Q" href="/p/item-{code}?c=1">img</a></div>"#
            )
        })
        .collect::<String>();
    format!("<html><body><div class=\"results\">{tiles}</div></body></html>")
}

fn page_number(url: &str) -> u32 {
    url::Url::parse(url)
        .unwrap()
        .query_pairs()
        .find(|(k, _)| k == "page")
        .and_then(|(_, v)| v.parse().ok())
        .unwrap()
}

#[async_trait]
impl PageFetcher for Listing {
    async fn fetch(&self, url: &str) -> Result<PageResponse> {
        let page = page_number(url);
        self.requests
            .lock()
            .unwrap()
            .push((page, url.to_string(), Instant::now()));

        let reply = self
            .pages
            .lock()
            .unwrap()
            .get_mut(&page)
            .and_then(|queue| queue.pop_front())
            .unwrap_or(Reply::Status(404));

        match reply {
            Reply::Tiles(codes) => Ok(PageResponse::new(200, tiles_html(&codes))),
            Reply::Status(status) => Ok(PageResponse::new(status, "")),
            Reply::Transport => Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            ))),
        }
    }
}

/// The paused clock jumps straight to timer deadlines, allow for millisecond rounding.
fn assert_gap(earlier: Instant, later: Instant, expected: Duration) {
    let gap = later - earlier;
    assert!(
        gap >= expected && gap < expected + Duration::from_millis(5),
        "expected a gap of {expected:?}, got {gap:?}"
    );
}

fn crawler(listing: Listing) -> Crawler<Listing> {
    Crawler::new(listing, &CrawlConfig::default()).unwrap()
}

fn three_pages() -> Listing {
    Listing::default()
        .page(1, [Reply::Tiles(vec!["1000-001", "1000-002"])])
        .page(2, [Reply::Tiles(vec!["1000-002", "2000-001"])])
        .page(3, [Reply::Tiles(vec!["3000-001", "1000-001"])])
        .page(4, [Reply::Status(404)])
}

#[tokio::test(start_paused = true)]
async fn visits_each_page_once_until_not_found() {
    let crawler = crawler(three_pages());
    let summary = crawler.crawl_summary(BASE, "").await;

    assert_eq!(summary.stop, StopReason::Exhausted);
    assert_eq!(summary.requests, 4);
    assert_eq!(summary.last_page, 4);
    assert!(summary.waits.is_empty());
    assert_eq!(
        summary.codes.finalize(CodeFormat::Dashed),
        vec!["1000-001", "1000-002", "2000-001", "3000-001"]
    );
}

#[tokio::test(start_paused = true)]
async fn requested_pages_are_sequential() {
    let listing = three_pages();
    let crawler = Crawler::new(&listing, &CrawlConfig::default()).unwrap();
    crawler.crawl(BASE, "").await;
    assert_eq!(listing.requested_pages(), vec![1, 2, 3, 4]);
}

#[tokio::test(start_paused = true)]
async fn throttled_page_is_retried_in_place_with_growing_waits() {
    let listing = Listing::default()
        .page(
            1,
            [
                Reply::Status(429),
                Reply::Status(429),
                Reply::Tiles(vec!["4444-444"]),
            ],
        )
        .page(2, [Reply::Status(404)]);
    let crawler = Crawler::new(&listing, &CrawlConfig::default()).unwrap();

    let summary = crawler.crawl_summary(BASE, "").await;

    assert_eq!(listing.requested_pages(), vec![1, 1, 1, 2]);
    assert_eq!(
        summary.waits,
        vec![Duration::from_secs(10), Duration::from_secs(20)]
    );

    let times = listing.request_times();
    assert_gap(times[0], times[1], Duration::from_secs(10));
    assert_gap(times[1], times[2], Duration::from_secs(20));
    assert_gap(times[2], times[3], Duration::ZERO);
    assert!(summary.codes.contains("4444-444"));
}

#[tokio::test(start_paused = true)]
async fn delay_resets_after_a_page_with_codes() {
    let listing = Listing::default()
        .page(1, [Reply::Status(429), Reply::Tiles(vec!["1111-111"])])
        .page(2, [Reply::Status(429), Reply::Tiles(vec!["2222-222"])]);
    let crawler = Crawler::new(&listing, &CrawlConfig::default()).unwrap();

    let summary = crawler.crawl_summary(BASE, "").await;

    assert_eq!(
        summary.waits,
        vec![Duration::from_secs(10), Duration::from_secs(10)]
    );
    assert_eq!(listing.requested_pages(), vec![1, 1, 2, 2, 3]);
    assert_eq!(summary.codes.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn empty_success_page_stops_immediately() {
    let listing = Listing::default()
        .page(1, [Reply::Tiles(vec!["5555-555"])])
        .page(2, [Reply::Tiles(vec![])])
        .page(3, [Reply::Tiles(vec!["6666-666"])]);
    let crawler = Crawler::new(&listing, &CrawlConfig::default()).unwrap();

    let summary = crawler.crawl_summary(BASE, "").await;

    assert_eq!(summary.stop, StopReason::EmptyPage);
    assert_eq!(listing.requested_pages(), vec![1, 2]);
    assert_eq!(summary.codes.finalize(CodeFormat::Dashed), vec!["5555-555"]);
}

#[tokio::test(start_paused = true)]
async fn empty_first_page_yields_nothing() {
    let listing = Listing::default().page(1, [Reply::Tiles(vec![])]);
    let crawler = Crawler::new(&listing, &CrawlConfig::default()).unwrap();

    let codes = crawler.crawl(BASE, "").await;

    assert!(codes.is_empty());
    assert_eq!(listing.requested_pages(), vec![1]);
}

#[tokio::test(start_paused = true)]
async fn server_error_keeps_partial_results() {
    let listing = Listing::default()
        .page(1, [Reply::Tiles(vec!["7000-001"])])
        .page(2, [Reply::Status(503)])
        .page(3, [Reply::Tiles(vec!["7000-003"])]);
    let crawler = Crawler::new(&listing, &CrawlConfig::default()).unwrap();

    let summary = crawler.crawl_summary(BASE, "").await;

    assert_eq!(summary.stop, StopReason::HttpStatus(503));
    assert!(summary.stop.is_failure());
    assert_eq!(listing.requested_pages(), vec![1, 2]);
    assert_eq!(summary.codes.finalize(CodeFormat::Dashed), vec!["7000-001"]);
}

#[tokio::test(start_paused = true)]
async fn transport_failure_keeps_partial_results() {
    let listing = Listing::default()
        .page(1, [Reply::Tiles(vec!["8000-001"])])
        .page(2, [Reply::Tiles(vec!["8000-002"])])
        .page(3, [Reply::Transport]);
    let crawler = Crawler::new(&listing, &CrawlConfig::default()).unwrap();

    let summary = crawler.crawl_summary(BASE, "").await;

    assert!(matches!(summary.stop, StopReason::Transport(_)));
    assert_eq!(summary.last_page, 3);
    assert_eq!(
        summary.codes.finalize(CodeFormat::Dashed),
        vec!["8000-001", "8000-002"]
    );
}

#[tokio::test(start_paused = true)]
async fn extra_params_follow_the_page_param() {
    let listing = Listing::default().page(1, [Reply::Tiles(vec!["1234-567"])]);
    let crawler = Crawler::new(&listing, &CrawlConfig::default()).unwrap();

    crawler.crawl(BASE, "q=rain+jacket&sort=price").await;

    assert_eq!(
        listing.urls(),
        vec![
            format!("{BASE}?page=1&q=rain+jacket&sort=price"),
            format!("{BASE}?page=2&q=rain+jacket&sort=price"),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn repeated_crawls_return_the_same_codes() {
    let first = crawler(three_pages()).crawl(BASE, "").await;
    let second = crawler(three_pages()).crawl(BASE, "").await;
    assert_eq!(first, second);
}

#[tokio::test(start_paused = true)]
async fn undashed_results_are_uniform() {
    let codes = crawler(three_pages()).crawl(BASE, "").await;
    let undashed = codes.finalize(CodeFormat::Undashed);

    assert_eq!(undashed.len(), codes.len());
    assert!(undashed
        .iter()
        .all(|c| c.len() == 7 && c.bytes().all(|b| b.is_ascii_digit())));
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let mut config = CrawlConfig::default();
    config.link_selector = "a[[".into();
    assert!(matches!(
        Crawler::new(Listing::default(), &config),
        Err(Error::Selector { .. })
    ));

    let mut config = CrawlConfig::default();
    config.backoff.base = Duration::ZERO;
    assert!(matches!(
        Crawler::new(Listing::default(), &config),
        Err(Error::Config(_))
    ));
}
