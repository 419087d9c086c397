use std::time::Duration;

use crate::{
    Error, Result, BASE_DELAY_SECS, MAX_DELAY_SECS, PRODUCT_LINK_SELECTOR, REQUEST_TIMEOUT_SECS,
    USER_AGENT,
};

/// Exponential backoff used when the listing answers with `429 Too Many Requests`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub cap: Duration,
}

impl Backoff {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap }
    }

    /// Doubles `delay`, never going past the cap.
    pub fn next(&self, delay: Duration) -> Duration {
        delay.saturating_mul(2).min(self.cap)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(BASE_DELAY_SECS),
            Duration::from_secs(MAX_DELAY_SECS),
        )
    }
}

/// Everything the crawler needs to know before issuing the first request.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub backoff: Backoff,
    /// CSS selector matching the anchors of product tiles.
    pub link_selector: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            user_agent: USER_AGENT.to_string(),
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            backoff: Backoff::default(),
            link_selector: PRODUCT_LINK_SELECTOR.to_string(),
        }
    }
}

impl CrawlConfig {
    pub fn validate(&self) -> Result<()> {
        if self.backoff.base.is_zero() {
            return Err(Error::Config("backoff base delay must be above zero".into()));
        }
        if self.backoff.base > self.backoff.cap {
            return Err(Error::Config(format!(
                "backoff base delay ({:?}) is larger than its cap ({:?})",
                self.backoff.base, self.backoff.cap
            )));
        }
        if self.timeout.is_zero() {
            return Err(Error::Config("request timeout must be above zero".into()));
        }
        Ok(())
    }
}
