use std::time::Duration;

use chrono::Local;
use clap::Parser;
use product_scrap::{
    info_time, render, CodeFormat, CrawlConfig, Crawler, ListingTarget, Result, Separator,
    BASE_DELAY_SECS, MAX_DELAY_SECS, PRODUCT_LINK_SELECTOR, REQUEST_TIMEOUT_SECS, USER_AGENT,
};

/// Collects product codes from every page of a product listing.
#[derive(Parser, Debug)]
#[command(name = "product-scrap", version, about)]
struct Cli {
    /// Full listing URL, query included. Any `page` parameter is ignored.
    url: String,

    /// Print codes as digits only (`1234567` instead of `1234-567`)
    #[arg(long)]
    undashed: bool,

    /// Print codes on one line, comma separated
    #[arg(long)]
    comma: bool,

    #[arg(long, default_value = USER_AGENT)]
    user_agent: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = REQUEST_TIMEOUT_SECS)]
    timeout: u64,

    /// First wait in seconds after a 429, doubled on every repeat
    #[arg(long, default_value_t = BASE_DELAY_SECS)]
    base_delay: u64,

    /// Longest wait in seconds after a 429
    #[arg(long, default_value_t = MAX_DELAY_SECS)]
    max_delay: u64,

    /// CSS selector for product tile links
    #[arg(long, default_value = PRODUCT_LINK_SELECTOR)]
    selector: String,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn config(&self) -> CrawlConfig {
        let mut config = CrawlConfig {
            user_agent: self.user_agent.clone(),
            timeout: Duration::from_secs(self.timeout),
            link_selector: self.selector.clone(),
            ..CrawlConfig::default()
        };
        config.backoff.base = Duration::from_secs(self.base_delay);
        config.backoff.cap = Duration::from_secs(self.max_delay);
        config
    }

    fn format(&self) -> CodeFormat {
        if self.undashed {
            CodeFormat::Undashed
        } else {
            CodeFormat::Dashed
        }
    }

    fn separator(&self) -> Separator {
        if self.comma {
            Separator::Comma
        } else {
            Separator::Newline
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let start_time = Local::now();
    let target = ListingTarget::parse(&cli.url)?;
    let crawler = Crawler::from_config(&cli.config())?;
    info_time!("Started crawling {}", target.base_url);

    let summary = crawler
        .crawl_summary(&target.base_url, &target.extra_params)
        .await;
    if summary.stop.is_failure() {
        log::warn!(
            "Crawl stopped early on page {} ({}). Results are partial.",
            summary.last_page,
            summary.stop
        );
    }

    let codes = summary.codes.finalize(cli.format());
    println!("\nProduct Codes:\n");
    println!("{}", render(&codes, cli.separator()));

    info_time!(start_time, "Full program time:");
    Ok(())
}
