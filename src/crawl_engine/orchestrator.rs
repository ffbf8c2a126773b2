//! Main crawl orchestration logic
//!
//! [`Tarantula`] owns the frontier, the leg pool and the handler registry.
//! A single driver loop reacts to client events one at a time:
//! - `Data` and `Error` count the task as visited and release its leg
//! - discovered links go through the frontier filter and onto the pool queue
//! - a drained pool ends the run with exactly one `Done`
//!
//! Fetches themselves run as spawned tasks on a `JoinSet`, at most `legs` at
//! once, and report back through a channel.

use chrono::Utc;
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;

use super::crawl_types::{CrawlError, CrawlResult, CrawlSummary, Task};
use super::frontier::Frontier;
use super::page_timeout::{fetch_deadline, with_fetch_timeout};
use crate::client::{ClientEvent, DefaultLegFactory, EventSink, FetchClient, SinkMessage};
use crate::config::{CrawlConfig, Headers};
use crate::crawl_events::{
    EventBusError, EventEmitter, EventKind, ShutdownReason, TarantulaEvent,
};
use crate::resource_pool::{Dispatch, LegFactory, LegId, Release, ResourcePool};
use crate::runtime::CrawlRequest;

/// What the driver loop should do after handling a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Drained,
}

/// Per-run state that does not outlive `start`
struct Run<F: LegFactory> {
    pool: ResourcePool<Arc<Task>, F>,
    fetches: JoinSet<()>,
    in_flight: HashMap<LegId, Arc<Task>>,
    headers: Headers,
    deadline: Duration,
    tx: mpsc::UnboundedSender<SinkMessage>,
    rx: mpsc::UnboundedReceiver<SinkMessage>,
}

impl<F: LegFactory> Run<F> {
    fn new(factory: F, config: &CrawlConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            pool: ResourcePool::new(factory, config.legs(), config.max_uses()),
            fetches: JoinSet::new(),
            in_flight: HashMap::new(),
            headers: config.request_headers(),
            deadline: fetch_deadline(config),
            tx,
            rx,
        }
    }
}

fn pool_error(err: anyhow::Error) -> CrawlError {
    CrawlError::Pool(format!("{err:#}"))
}

/// The crawler
///
/// ```rust,ignore
/// let config = CrawlConfig::builder().legs(4).stay_in_range(true).build()?;
/// let mut crawler = Tarantula::new(config)?;
/// crawler.on(EventKind::VisitData, |event| println!("{event:?}"));
/// let summary = crawler.start(["https://example.com/"]).await?;
/// ```
pub struct Tarantula<F: LegFactory = DefaultLegFactory>
where
    F::Leg: FetchClient,
{
    config: Arc<CrawlConfig>,
    factory: Option<F>,
    emitter: EventEmitter,
    frontier: Frontier,
    visited: usize,
}

impl Tarantula<DefaultLegFactory> {
    /// Crawler whose legs are built from `config.client_kind()`
    pub fn new(config: CrawlConfig) -> CrawlResult<Self> {
        if config.legs() == 0 || config.max_uses() == 0 {
            return Err(CrawlError::Config(
                "legs and max_uses must both be at least 1".to_string(),
            ));
        }
        let config = Arc::new(config);
        let factory = DefaultLegFactory::new(Arc::clone(&config));
        Ok(Self::from_parts(config, factory))
    }
}

impl<F: LegFactory> Tarantula<F>
where
    F::Leg: FetchClient,
{
    /// Crawler with a caller-supplied leg factory
    pub fn with_factory(config: CrawlConfig, factory: F) -> Self {
        Self::from_parts(Arc::new(config), factory)
    }

    fn from_parts(config: Arc<CrawlConfig>, factory: F) -> Self {
        Self {
            config,
            factory: Some(factory),
            emitter: EventEmitter::new(),
            frontier: Frontier::new(),
            visited: 0,
        }
    }

    #[must_use]
    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Tasks that reached a data or error outcome so far
    #[must_use]
    pub fn visited(&self) -> usize {
        self.visited
    }

    #[must_use]
    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    /// Register a handler for every event of `kind`
    pub fn on<H>(&mut self, kind: EventKind, handler: H) -> &mut Self
    where
        H: FnMut(&TarantulaEvent) + Send + 'static,
    {
        self.emitter.on(kind, handler);
        self
    }

    /// Run `start` on a background task
    pub fn spawn<I, S>(mut self, seeds: I) -> CrawlRequest
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let seeds: Vec<String> = seeds.into_iter().map(Into::into).collect();
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let result = self.start(seeds).await;
            let _ = tx.send(result);
        });
        CrawlRequest::new(rx)
    }

    /// Push the seeds and drive the crawl until the pool drains
    ///
    /// A crawler runs once; a second call returns
    /// [`CrawlError::AlreadyStarted`].
    pub async fn start<I, S>(&mut self, seeds: I) -> CrawlResult<CrawlSummary>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let factory = self.factory.take().ok_or(CrawlError::AlreadyStarted)?;
        let seeds: Vec<String> = seeds.into_iter().map(Into::into).collect();

        let started_at = Utc::now();
        let clock = Instant::now();
        info!(
            target: "tarantula::orchestrator",
            "Starting crawl of {} seed(s) with {} leg(s)",
            seeds.len(),
            self.config.legs()
        );

        let mut run = Run::new(factory, &self.config);
        let outcome = self.drive(&mut run, &seeds).await;
        run.fetches.abort_all();

        match outcome {
            Ok(()) => {
                let duration = clock.elapsed();
                let summary = CrawlSummary {
                    visited: self.visited,
                    frontier_len: self.frontier.len(),
                    started_at,
                    finished_at: Utc::now(),
                    duration,
                };
                info!(
                    target: "tarantula::orchestrator",
                    "Crawl done: {} visited, {} in frontier, {:.2}s",
                    summary.visited,
                    summary.frontier_len,
                    duration.as_secs_f64()
                );
                self.emit(TarantulaEvent::done(
                    summary.visited,
                    summary.frontier_len,
                    duration,
                ));
                if let Some(bus) = self.config.event_bus() {
                    bus.shutdown(ShutdownReason::CrawlCompleted);
                }
                Ok(summary)
            }
            Err(err) => {
                error!(target: "tarantula::orchestrator", "Crawl aborted: {err}");
                if let Err(e) = run.pool.shutdown().await {
                    warn!(target: "tarantula::orchestrator", "Leg cleanup failed: {e:#}");
                }
                if let Some(bus) = self.config.event_bus() {
                    bus.shutdown(ShutdownReason::Error(err.to_string()));
                }
                Err(err)
            }
        }
    }

    async fn drive(&mut self, run: &mut Run<F>, seeds: &[String]) -> CrawlResult<()> {
        let admitted = self.frontier.admit(seeds, None, &self.config);
        if admitted.is_empty() {
            info!(target: "tarantula::orchestrator", "No seed was admitted, nothing to crawl");
            return Ok(());
        }

        let tasks = admitted
            .into_iter()
            .map(|uri| Arc::new(Task::new(uri, None)));
        let dispatches = run.pool.enqueue(tasks).await.map_err(pool_error)?;
        self.follow(run, dispatches)?;

        loop {
            tokio::select! {
                message = run.rx.recv() => {
                    // The run holds a sender, so the channel never closes here
                    let Some(message) = message else {
                        return Err(CrawlError::Other("client event channel closed".to_string()));
                    };
                    if self.handle(run, message).await? == Flow::Drained {
                        return Ok(());
                    }
                }
                Some(joined) = run.fetches.join_next() => {
                    if let Err(e) = joined
                        && e.is_panic()
                    {
                        error!(
                            target: "tarantula::orchestrator",
                            "Fetch task panicked; its leg stays leased"
                        );
                    }
                }
            }
        }
    }

    /// Start a fetch on every dispatched lease
    fn follow(&mut self, run: &mut Run<F>, dispatches: Vec<Dispatch<Arc<Task>>>) -> CrawlResult<()> {
        let extractor = self.config.link_extractor();
        for Dispatch { task, lease } in dispatches {
            let leg = run.pool.leg_mut(lease).ok_or_else(|| {
                CrawlError::Pool(format!("dispatched lease {lease:?} has no leg"))
            })?;

            let sink = EventSink::for_task(run.tx.clone(), Arc::clone(&task), lease);
            leg.configure(&run.headers, self.config.proxy())
                .set_event_sink(sink.clone());
            let fetch = leg.fetch(&task.uri, Arc::clone(&extractor));

            debug!(
                target: "tarantula::orchestrator",
                "Slot {} fetching {}",
                lease.slot,
                task.uri
            );
            run.in_flight.insert(lease, task);
            run.fetches
                .spawn(with_fetch_timeout(fetch, run.deadline, sink));
        }
        Ok(())
    }

    async fn handle(&mut self, run: &mut Run<F>, message: SinkMessage) -> CrawlResult<Flow> {
        let SinkMessage { task, lease, event } = message;

        match event {
            ClientEvent::Request { .. } => {
                self.emit(TarantulaEvent::Request { task });
                Ok(Flow::Continue)
            }
            ClientEvent::Response {
                status,
                content_type,
            } => {
                self.emit(TarantulaEvent::Visit {
                    task,
                    status,
                    content_type,
                });
                Ok(Flow::Continue)
            }
            ClientEvent::Data { links, page_uri } => {
                if run.in_flight.remove(&lease).is_none() {
                    debug!(
                        target: "tarantula::orchestrator",
                        "Ignoring late result for {}",
                        task.uri
                    );
                    return Ok(Flow::Continue);
                }
                self.visited += 1;

                self.emit(TarantulaEvent::VisitData {
                    task: Arc::clone(&task),
                    links: links.clone(),
                    page_uri: page_uri.clone(),
                });
                let admitted = self.frontier.admit(&links, Some(&page_uri), &self.config);

                if !admitted.is_empty() {
                    let new_count = admitted.len();
                    let tasks: Vec<Arc<Task>> = admitted
                        .into_iter()
                        .map(|uri| Arc::new(Task::new(uri, Some(page_uri.clone()))))
                        .collect();
                    let dispatches = run.pool.enqueue(tasks).await.map_err(pool_error)?;
                    self.emit(TarantulaEvent::UrisDiscovered {
                        task,
                        new_count,
                        total: self.frontier.len(),
                    });
                    self.follow(run, dispatches)?;
                }

                self.release(run, lease).await
            }
            ClientEvent::Error { code, message } => {
                if run.in_flight.remove(&lease).is_none() {
                    debug!(
                        target: "tarantula::orchestrator",
                        "Ignoring late error for {}: {message}",
                        task.uri
                    );
                    return Ok(Flow::Continue);
                }
                self.visited += 1;
                self.emit(TarantulaEvent::Error {
                    task,
                    code,
                    message,
                });
                self.release(run, lease).await
            }
            ClientEvent::ContractViolation { message } => Err(CrawlError::ContractViolation {
                uri: task.uri.clone(),
                message,
            }),
        }
    }

    async fn release(&mut self, run: &mut Run<F>, lease: LegId) -> CrawlResult<Flow> {
        match run.pool.release(lease).await.map_err(pool_error)? {
            Release::Dispatched(dispatches) => {
                self.follow(run, dispatches)?;
                Ok(Flow::Continue)
            }
            Release::Pending => Ok(Flow::Continue),
            Release::Drained => Ok(Flow::Drained),
        }
    }

    /// Hand an event to registered handlers and the optional bus
    fn emit(&mut self, event: TarantulaEvent) {
        self.emitter.emit(&event);
        if let Some(bus) = self.config.event_bus() {
            match bus.publish(event) {
                Ok(_) | Err(EventBusError::NoSubscribers) => {}
                Err(e) => debug!(target: "tarantula::orchestrator", "Event not published: {e}"),
            }
        }
    }
}
