// tarantula: crawl from seed URIs and report progress on stdout.
//
// Exit codes: 0 when the crawl drained, 2 on any fatal error.

mod cli;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::Cli;
use tarantula::{EventKind, Tarantula, TarantulaEvent};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let exit_code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {e:#}");
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.to_config()?;
    let mut crawler = Tarantula::new(config)?;

    if cli.json {
        for kind in [
            EventKind::Request,
            EventKind::Visit,
            EventKind::VisitData,
            EventKind::Error,
            EventKind::UrisDiscovered,
            EventKind::Done,
        ] {
            crawler.on(kind, print_json);
        }
    } else {
        println!("Crawling… {}", cli.seeds.join(" "));
        crawler
            .on(EventKind::Request, |event| {
                if let Some(task) = event.task() {
                    println!("GET {}", task.uri);
                }
            })
            .on(EventKind::Visit, |event| {
                if let TarantulaEvent::Visit { task, status, .. } = event {
                    println!("{status} {}", task.uri);
                }
            })
            .on(EventKind::UrisDiscovered, |event| {
                if let TarantulaEvent::UrisDiscovered {
                    new_count, total, ..
                } = event
                {
                    println!("{total} (+{new_count})");
                }
            })
            .on(EventKind::Error, |event| {
                if let TarantulaEvent::Error {
                    task,
                    code,
                    message,
                } = event
                {
                    eprintln!("{code} {} {message}", task.uri);
                }
            })
            .on(EventKind::Done, |event| {
                if let TarantulaEvent::Done {
                    visited, duration, ..
                } = event
                {
                    println!("done: {visited} visited in {:.1}s", duration.as_secs_f64());
                }
            });
    }

    crawler.start(cli.seeds.clone()).await?;
    Ok(())
}

fn print_json(event: &TarantulaEvent) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{line}"),
        Err(e) => tracing::warn!("Failed to serialize event: {}", e),
    }
}
