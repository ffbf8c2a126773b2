//! Command-line arguments for the `tarantula` binary

use anyhow::{Context, Result, anyhow};
use clap::Parser;

use tarantula::{ClientKind, CrawlConfig, ProxySettings};

#[derive(Parser, Debug)]
#[command(
    name = "tarantula",
    version,
    about = "Crawl a site from one or more seed URIs, printing progress as pages are visited"
)]
pub struct Cli {
    /// Seed URIs to start from
    #[arg(required = true)]
    pub seeds: Vec<String>,

    /// Number of concurrent legs
    #[arg(long, default_value_t = tarantula::utils::DEFAULT_LEGS)]
    pub legs: usize,

    /// Fetches per leg before it is recycled
    #[arg(long, default_value_t = tarantula::utils::DEFAULT_MAX_USES)]
    pub max_uses: u32,

    /// Treat `page#a` and `page#b` as different URIs
    #[arg(long)]
    pub keep_hashes: bool,

    /// Visit URIs again even if they were already admitted
    #[arg(long)]
    pub keep_dupes: bool,

    /// Only follow links under the seeds' directories
    #[arg(long)]
    pub stay_in_range: bool,

    /// Render pages in headless chromium before extracting links
    #[arg(long)]
    pub browser: bool,

    /// Show the browser window (implies --browser)
    #[arg(long)]
    pub headed: bool,

    /// Extra request header, `Name: value`. Repeatable.
    #[arg(short = 'H', long = "header", value_name = "HEADER")]
    pub headers: Vec<String>,

    #[arg(long)]
    pub user_agent: Option<String>,

    /// Upstream proxy, `host[:port]`
    #[arg(long)]
    pub proxy: Option<String>,

    #[arg(long, requires = "proxy")]
    pub proxy_user: Option<String>,

    #[arg(long, requires = "proxy_user")]
    pub proxy_password: Option<String>,

    /// Accept invalid TLS certificates
    #[arg(long)]
    pub insecure: bool,

    /// Skip URIs matching this glob (`*` wildcard). Repeatable.
    #[arg(long = "exclude", value_name = "GLOB")]
    pub excludes: Vec<String>,

    /// Per-fetch timeout in seconds
    #[arg(long, default_value_t = tarantula::utils::DEFAULT_FETCH_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Print every event as a JSON line instead of progress text
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    pub fn to_config(&self) -> Result<CrawlConfig> {
        let mut builder = CrawlConfig::builder()
            .legs(self.legs)
            .max_uses(self.max_uses)
            .trim_hashes(!self.keep_hashes)
            .skip_dupes(!self.keep_dupes)
            .stay_in_range(self.stay_in_range)
            .strict_tls(!self.insecure)
            .fetch_timeout_secs(self.timeout)
            .headless(!self.headed);

        if self.browser || self.headed {
            builder = builder.client_kind(ClientKind::Browser);
        }
        if let Some(agent) = &self.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        for raw in &self.headers {
            let (name, value) = parse_header(raw)?;
            builder = builder.header(name, value);
        }
        if let Some(proxy) = &self.proxy {
            let mut settings = parse_proxy(proxy)?;
            if let Some(user) = &self.proxy_user {
                settings = settings.with_credentials(
                    user.clone(),
                    self.proxy_password.clone().unwrap_or_default(),
                );
            }
            builder = builder.proxy(settings);
        }
        if !self.excludes.is_empty() {
            builder = builder.excluded_patterns(self.excludes.clone());
        }

        builder.build().context("Invalid crawl options")
    }
}

fn parse_header(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("Header '{raw}' is not in 'Name: value' form"))?;
    Ok((name.trim().to_string(), value.trim().to_string()))
}

fn parse_proxy(raw: &str) -> Result<ProxySettings> {
    match raw.rsplit_once(':') {
        Some((host, port)) if !host.ends_with('/') && !port.starts_with('/') => {
            let port = port
                .parse::<u16>()
                .with_context(|| format!("Invalid proxy port in '{raw}'"))?;
            Ok(ProxySettings::new(host).with_port(port))
        }
        _ => Ok(ProxySettings::new(raw)),
    }
}
