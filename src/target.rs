use url::{form_urlencoded, Position, Url};

use crate::{Error, Result, PAGE_PARAM};

/// A listing URL split into the part the crawler paginates over and the
/// fixed query it forwards with every page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingTarget {
    /// Scheme, authority and path. No query, no fragment.
    pub base_url: String,
    /// Pre-encoded query string without any `page` pair. May be empty.
    pub extra_params: String,
}

impl ListingTarget {
    /// Splits a full listing URL, dropping any `page` parameter and pairs with blank values.
    pub fn parse(full_url: &str) -> Result<Self> {
        let url = Url::parse(full_url.trim())?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(Error::InvalidUrl(full_url.to_string()));
        }

        let base_url = url[..Position::AfterPath].to_string();
        let extra_params = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(
                url.query_pairs()
                    .filter(|(key, value)| key != PAGE_PARAM && !value.is_empty()),
            )
            .finish();

        Ok(Self {
            base_url,
            extra_params,
        })
    }
}
