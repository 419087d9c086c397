use std::fmt;
use std::time::Duration;

use chrono::Local;

use crate::codes::CodeSet;
use crate::parse::CodeExtractor;
use crate::request::{page_url, HttpFetcher, PageFetcher};
use crate::{info_time, Backoff, CrawlConfig, Result, START_PAGE};

/// Where the crawl is: the page to request next and the wait to use if it gets throttled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlState {
    pub page: u32,
    pub delay: Duration,
}

/// How a single page request turned out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// `200 OK` with this many product codes on it.
    Codes(usize),
    /// `200 OK` without a single product code.
    Empty,
    NotFound,
    RateLimited,
    Failed(u16),
    /// The request never got a status back.
    Transport(String),
}

impl PageOutcome {
    pub fn from_status(status: u16, codes_on_page: usize) -> Self {
        match status {
            200 if codes_on_page > 0 => PageOutcome::Codes(codes_on_page),
            200 => PageOutcome::Empty,
            404 => PageOutcome::NotFound,
            429 => PageOutcome::RateLimited,
            other => PageOutcome::Failed(other),
        }
    }
}

/// What the crawl loop does after a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Sleep, then ask for the same page again.
    Wait(Duration),
    Advance,
    Stop(StopReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The listing answered `404` for the page after the last one.
    Exhausted,
    /// The listing answered `200` with no product tiles.
    EmptyPage,
    HttpStatus(u16),
    Transport(String),
}

impl StopReason {
    /// `true` when the crawl was cut short rather than reaching the end of the listing.
    pub fn is_failure(&self) -> bool {
        matches!(self, StopReason::HttpStatus(_) | StopReason::Transport(_))
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Exhausted => write!(f, "no more pages"),
            StopReason::EmptyPage => write!(f, "empty page"),
            StopReason::HttpStatus(status) => write!(f, "unexpected status {status}"),
            StopReason::Transport(err) => write!(f, "request failed: {err}"),
        }
    }
}

impl CrawlState {
    pub fn start(backoff: &Backoff) -> Self {
        Self {
            page: START_PAGE,
            delay: backoff.base,
        }
    }

    /// Decides the next state and action from the outcome of the current page.
    ///
    /// Only a throttled page keeps the page number, and only a page with codes
    /// moves it forward. Everything else stops the crawl where it is.
    pub fn step(self, outcome: PageOutcome, backoff: &Backoff) -> (Self, Action) {
        match outcome {
            PageOutcome::RateLimited => (
                Self {
                    page: self.page,
                    delay: backoff.next(self.delay),
                },
                Action::Wait(self.delay),
            ),
            PageOutcome::Codes(_) => (
                Self {
                    page: self.page + 1,
                    delay: backoff.base,
                },
                Action::Advance,
            ),
            PageOutcome::Empty => (self, Action::Stop(StopReason::EmptyPage)),
            PageOutcome::NotFound => (self, Action::Stop(StopReason::Exhausted)),
            PageOutcome::Failed(status) => (self, Action::Stop(StopReason::HttpStatus(status))),
            PageOutcome::Transport(err) => (self, Action::Stop(StopReason::Transport(err))),
        }
    }
}

/// Everything a finished crawl knows about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlSummary {
    pub codes: CodeSet,
    /// Requests issued, throttled retries included.
    pub requests: usize,
    /// The page the crawl stopped on.
    pub last_page: u32,
    /// Backoff sleeps, in the order they happened.
    pub waits: Vec<Duration>,
    pub stop: StopReason,
}

/// Sequential, throttle-aware crawler over a paginated product listing.
pub struct Crawler<F> {
    fetcher: F,
    extractor: CodeExtractor,
    backoff: Backoff,
}

impl Crawler<HttpFetcher> {
    pub fn from_config(config: &CrawlConfig) -> Result<Self> {
        Self::new(HttpFetcher::new(config)?, config)
    }
}

impl<F: PageFetcher> Crawler<F> {
    pub fn new(fetcher: F, config: &CrawlConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            fetcher,
            extractor: CodeExtractor::new(&config.link_selector)?,
            backoff: config.backoff,
        })
    }

    /// Collects every product code reachable by paging through `base_url`.
    /// HTTP errors and failed requests end the crawl, they never lose the codes found so far.
    pub async fn crawl(&self, base_url: &str, extra_params: &str) -> CodeSet {
        self.crawl_summary(base_url, extra_params).await.codes
    }

    pub async fn crawl_summary(&self, base_url: &str, extra_params: &str) -> CrawlSummary {
        let start_time = Local::now();
        let mut codes = CodeSet::new();
        let mut state = CrawlState::start(&self.backoff);
        let mut requests = 0;
        let mut waits = Vec::new();

        let stop = loop {
            let url = page_url(base_url, state.page, extra_params);
            log::debug!("Requesting page {}: {}", state.page, url);
            requests += 1;

            let outcome = self.fetch_page(&url, &mut codes).await;
            let (next, action) = state.step(outcome, &self.backoff);
            match action {
                Action::Wait(delay) => {
                    log::warn!(
                        "Too many requests on page {}. Waiting {} sec before retrying.",
                        state.page,
                        delay.as_secs()
                    );
                    waits.push(delay);
                    tokio::time::sleep(delay).await;
                }
                Action::Advance => {}
                Action::Stop(reason) => {
                    match &reason {
                        StopReason::Exhausted => {
                            log::info!("No more pages found. Stopping at page {}.", state.page)
                        }
                        StopReason::EmptyPage => {
                            log::info!("No product codes found on page {}. Stopping.", state.page)
                        }
                        StopReason::HttpStatus(status) => {
                            log::error!("Failed to fetch {}. Status code: {}", url, status)
                        }
                        StopReason::Transport(_) => {}
                    }
                    break reason;
                }
            }
            state = next;
        };

        info_time!(
            start_time,
            "Crawl finished ({}): {} codes over {} requests.",
            stop,
            codes.len(),
            requests
        );

        CrawlSummary {
            codes,
            requests,
            last_page: state.page,
            waits,
            stop,
        }
    }

    /// Requests one page and adds its codes to `codes`.
    async fn fetch_page(&self, url: &str, codes: &mut CodeSet) -> PageOutcome {
        let res = match self.fetcher.fetch(url).await {
            Ok(res) => res,
            Err(e) => {
                log::error!("Error during request to {}: {}", url, e);
                return PageOutcome::Transport(e.to_string());
            }
        };

        let found = if res.status == 200 {
            let page_codes = self.extractor.extract(&res.body);
            let found = page_codes.len();
            codes.extend(page_codes);
            log::info!("Found {} codes at {} ({} unique so far).", found, url, codes.len());
            found
        } else {
            0
        };
        PageOutcome::from_status(res.status, found)
    }
}
