pub mod browser_profile;
pub mod browser_setup;
pub mod client;
pub mod config;
pub mod crawl_engine;
pub mod crawl_events;
pub mod resource_pool;
pub mod runtime;
pub mod utils;

pub use browser_setup::{
    LaunchOptions, download_managed_browser, find_browser_executable, launch_browser,
};
pub use client::{
    AnchorExtractor, BrowserClient, ClientEvent, DefaultLegFactory, ErrorCode, EventSink,
    ExtractError, FetchClient, Leg, LinkExtractor, PageHandle, StaticClient,
};
pub use config::{ClientKind, CrawlConfig, CrawlConfigBuilder, Headers, ProxySettings};
pub use crawl_engine::{CrawlError, CrawlResult, CrawlSummary, Frontier, Tarantula, Task};
pub use crawl_events::{CrawlEventBus, EventKind, TarantulaEvent};
pub use resource_pool::{LegFactory, LegId, ResourcePool};
pub use runtime::CrawlRequest;

/// Crawl `seeds` with `config` and the default legs, returning once the
/// pool drains
pub async fn crawl<I, S>(config: CrawlConfig, seeds: I) -> CrawlResult<CrawlSummary>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut crawler = Tarantula::new(config)?;
    crawler.start(seeds).await
}
