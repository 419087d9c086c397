//! PRODUCT CODE SCRAPER
//! Walks a paginated product listing one page at a time and collects the
//! `####-###` product codes linked from every product tile.

mod macros;

pub mod codes;
pub mod config;
pub mod error;
pub mod parse;
pub mod process;
pub mod request;
pub mod target;

pub use codes::{render, CodeFormat, CodeSet, ProductCode, Separator};
pub use config::{Backoff, CrawlConfig};
pub use error::{Error, Result};
pub use process::{CrawlSummary, Crawler, StopReason};
pub use request::{HttpFetcher, PageFetcher, PageResponse};
pub use target::ListingTarget;

/// Pagination is owned by the crawler, this key is never forwarded from user input.
pub const PAGE_PARAM: &str = "page";
pub const START_PAGE: u32 = 1;
pub const REQUEST_TIMEOUT_SECS: u64 = 10;
pub const BASE_DELAY_SECS: u64 = 10;
pub const MAX_DELAY_SECS: u64 = 300;
/// Anchors on product tiles carry a generated class like `Hit_hitImageLink__x1y2z`.
pub const PRODUCT_LINK_SELECTOR: &str = "[class^='Hit_hitImageLink']";
/// ASCII digits only, `\d` would also match other scripts' digits.
pub const PRODUCT_CODE_PATTERN: &str = r"\b[0-9]{4}-[0-9]{3}\b";
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/91.0.4472.124 Safari/537.36";
