use regex::Regex;
use scraper::{Html, Selector};

use crate::codes::ProductCode;
use crate::{Error, Result, PRODUCT_CODE_PATTERN};

/// Pulls product codes out of a listing page.
///
/// Every anchor matching the tile selector is checked for an `href`, and the
/// first `####-###` run in that link is taken as the tile's product code.
/// Anchors without a link, or whose link has no code, are skipped.
#[derive(Debug, Clone)]
pub struct CodeExtractor {
    link_selector: Selector,
    code_pattern: Regex,
}

impl CodeExtractor {
    pub fn new(link_selector: &str) -> Result<Self> {
        Ok(Self {
            link_selector: create_selector(link_selector)?,
            code_pattern: Regex::new(PRODUCT_CODE_PATTERN)?,
        })
    }

    /// Codes in page order. Repeats within the page are kept, the crawl's set drops them.
    pub fn extract(&self, html: &str) -> Vec<ProductCode> {
        let doc = Html::parse_document(html);
        let codes = doc
            .select(&self.link_selector)
            .filter_map(|link| link.value().attr("href"))
            .filter_map(|href| self.code_pattern.find(href))
            .filter_map(|m| ProductCode::parse(m.as_str()))
            .collect();
        codes
    }
}

#[inline]
fn create_selector(sel_str: &str) -> Result<Selector> {
    Selector::parse(sel_str).map_err(|e| Error::selector(sel_str, e))
}
