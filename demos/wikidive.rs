//! Dive into Wikipedia with a handful of legs, staying on the same host.
//!
//! Pass `--browser` to render pages with chromium instead of plain HTTP.
//!
//! ```sh
//! cargo run --example wikidive
//! cargo run --example wikidive -- --browser
//! ```

use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tarantula::{ClientKind, CrawlConfig, EventKind, Tarantula, TarantulaEvent};

const SITE: &str = "http://en.wikipedia.org/";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let browser = std::env::args().any(|arg| arg == "--browser");
    let config = CrawlConfig::builder()
        .legs(if browser { 2 } else { 10 })
        .stay_in_range(true)
        .client_kind(if browser {
            ClientKind::Browser
        } else {
            ClientKind::Static
        })
        .build()?;

    let mut crawler = Tarantula::new(config)?;
    let visited = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&visited);
    let failed = Arc::clone(&visited);

    crawler
        .on(EventKind::Request, |event| {
            if let Some(task) = event.task() {
                println!("GET {}", task.uri);
            }
        })
        .on(EventKind::VisitData, move |_| {
            counted.fetch_add(1, Ordering::Relaxed);
        })
        .on(EventKind::Error, move |event| {
            failed.fetch_add(1, Ordering::Relaxed);
            if let TarantulaEvent::Error { task, code, message } = event {
                eprintln!(
                    "{code} {} from {}: {message}",
                    task.uri,
                    task.parent.as_deref().unwrap_or("-")
                );
            }
        })
        .on(EventKind::UrisDiscovered, move |event| {
            if let TarantulaEvent::UrisDiscovered { new_count, total, .. } = event {
                let seen = visited.load(Ordering::Relaxed);
                println!(
                    "V:{seen} T:{total} Q:{} +{new_count}",
                    total.saturating_sub(seen)
                );
            }
        })
        .on(EventKind::Done, |_| println!("done"));

    println!("Crawling… {SITE}");
    let summary = crawler.start([SITE]).await?;
    println!(
        "{} pages visited, {} URIs admitted",
        summary.visited, summary.frontier_len
    );
    Ok(())
}
