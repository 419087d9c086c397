use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::{CrawlConfig, Result, PAGE_PARAM};

/// What came back for one listing page. The body is only read for `200 OK`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResponse {
    pub status: u16,
    pub body: String,
}

impl PageResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Anything that can GET a listing page.
/// An `Err` means the request never produced a status (connection, timeout, ...).
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<PageResponse>;
}

#[async_trait]
impl<'a, T: PageFetcher + ?Sized> PageFetcher for &'a T {
    async fn fetch(&self, url: &str) -> Result<PageResponse> {
        (**self).fetch(url).await
    }
}

/// Fetches pages over HTTP with a fixed browser User-Agent and per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &CrawlConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<PageResponse> {
        let res = self.client.get(url).send().await?;
        let status = res.status();
        let body = if status == StatusCode::OK {
            res.text().await?
        } else {
            String::new()
        };
        Ok(PageResponse::new(status.as_u16(), body))
    }
}

/// Builds `{base_url}?page={page}[&{extra_params}]`.
pub fn page_url(base_url: &str, page: u32, extra_params: &str) -> String {
    let mut url = format!("{base_url}?{PAGE_PARAM}={page}");
    if !extra_params.is_empty() {
        url.push('&');
        url.push_str(extra_params);
    }
    url
}
