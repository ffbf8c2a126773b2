//! Fixed-capacity pool of reusable worker legs
//!
//! Slots are filled lazily through a [`LegFactory`]. Each leg serves at most
//! `max_uses` tasks before it is destroyed and its slot emptied. The pool also
//! owns the FIFO queue of tasks waiting for a free leg, and reports exactly
//! once when the queue is empty and no leg is leased.

use anyhow::{Context, Result, anyhow};
use futures::future::BoxFuture;
use serde::Serialize;
use std::collections::VecDeque;
use tracing::{debug, info, warn};

// =============================================================================
// Leg Factory
// =============================================================================

/// Produces and tears down legs for the pool
///
/// Both operations are async because legs may own external processes
/// (a chromium instance) that take time to launch and close.
pub trait LegFactory: Send + 'static {
    type Leg: Send + 'static;

    /// Construct a fresh leg for `slot`
    fn create(&mut self, slot: usize) -> BoxFuture<'_, Result<Self::Leg>>;

    /// Release everything the leg holds
    fn destroy(&mut self, leg: Self::Leg) -> BoxFuture<'_, Result<()>>;
}

// =============================================================================
// Leases and Results
// =============================================================================

/// Handle to a leased leg
///
/// The generation changes every time a slot gets a new leg, so a lease that
/// outlives its leg cannot release the replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct LegId {
    pub slot: usize,
    pub generation: u64,
}

/// A task paired with the leg that should run it
#[derive(Debug)]
pub struct Dispatch<T> {
    pub task: T,
    pub lease: LegId,
}

/// What happened after a leg was returned
#[derive(Debug)]
pub enum Release<T> {
    /// Queued tasks were handed to free legs
    Dispatched(Vec<Dispatch<T>>),
    /// Other legs are still busy; nothing to do yet
    Pending,
    /// Queue empty and no leg leased: all legs were destroyed
    Drained,
}

/// Point-in-time view of the pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub capacity: usize,
    pub active: usize,
    pub pending: usize,
    pub live_legs: usize,
    pub created: u64,
    pub destroyed: u64,
}

// =============================================================================
// Slots
// =============================================================================

#[derive(Debug)]
struct Slot<L> {
    leg: Option<L>,
    generation: u64,
    active: bool,
    uses: u32,
}

impl<L> Slot<L> {
    fn empty() -> Self {
        Self {
            leg: None,
            generation: 0,
            active: false,
            uses: 0,
        }
    }

    fn is_idle(&self) -> bool {
        !self.active && self.leg.is_some()
    }

    fn is_empty(&self) -> bool {
        !self.active && self.leg.is_none()
    }
}

// =============================================================================
// Resource Pool
// =============================================================================

/// Bounded pool of legs plus the queue of tasks waiting for them
pub struct ResourcePool<T, F: LegFactory> {
    factory: F,
    slots: Vec<Slot<F::Leg>>,
    tasks: VecDeque<T>,
    max_uses: u32,
    active: usize,
    next_generation: u64,
    created: u64,
    destroyed: u64,
    completed: bool,
}

impl<T, F: LegFactory> ResourcePool<T, F> {
    /// Create a pool with `capacity` empty slots. Legs are built on demand.
    pub fn new(factory: F, capacity: usize, max_uses: u32) -> Self {
        let slots = (0..capacity.max(1)).map(|_| Slot::empty()).collect();
        Self {
            factory,
            slots,
            tasks: VecDeque::new(),
            max_uses: max_uses.max(1),
            active: 0,
            next_generation: 1,
            created: 0,
            destroyed: 0,
            completed: false,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn active(&self) -> usize {
        self.active
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// No queued tasks and no leased legs
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.tasks.is_empty() && self.active == 0
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            capacity: self.slots.len(),
            active: self.active,
            pending: self.tasks.len(),
            live_legs: self.slots.iter().filter(|s| s.leg.is_some()).count(),
            created: self.created,
            destroyed: self.destroyed,
        }
    }

    /// Mutable access to a leased leg
    pub fn leg_mut(&mut self, lease: LegId) -> Option<&mut F::Leg> {
        self.slots
            .get_mut(lease.slot)
            .filter(|slot| slot.active && slot.generation == lease.generation)
            .and_then(|slot| slot.leg.as_mut())
    }

    /// Append tasks to the queue and hand out as many as free legs allow
    pub async fn enqueue<I>(&mut self, tasks: I) -> Result<Vec<Dispatch<T>>>
    where
        I: IntoIterator<Item = T>,
    {
        if self.completed {
            return Err(anyhow!("pool already drained; no further tasks accepted"));
        }
        self.tasks.extend(tasks);
        self.churn().await
    }

    /// Lease a leg: first idle slot, else build one in the first empty slot.
    /// Returns `None` when every slot is leased.
    pub async fn acquire(&mut self) -> Result<Option<LegId>> {
        // Slot lookups finish before the factory await; the future must stay
        // Send without requiring Sync legs.
        let idle = self.slots.iter().position(Slot::is_idle);
        let empty = self.slots.iter().position(Slot::is_empty);
        let index = match idle {
            Some(index) => index,
            None => match empty {
                Some(index) => {
                    let leg = self
                        .factory
                        .create(index)
                        .await
                        .with_context(|| format!("Failed to create leg for slot {index}"))?;
                    let generation = self.next_generation;
                    self.next_generation += 1;
                    self.created += 1;

                    let slot = &mut self.slots[index];
                    slot.leg = Some(leg);
                    slot.generation = generation;
                    slot.uses = 0;
                    debug!(target: "tarantula::pool", "Created leg {generation} in slot {index}");
                    index
                }
                None => return Ok(None),
            },
        };

        let slot = &mut self.slots[index];
        slot.active = true;
        slot.uses += 1;
        self.active += 1;

        Ok(Some(LegId {
            slot: index,
            generation: slot.generation,
        }))
    }

    /// Return a leased leg to the pool
    ///
    /// A leg that has reached `max_uses` is destroyed and its slot emptied.
    /// Afterwards queued tasks are dispatched; if there are none and nothing
    /// is leased, every remaining leg is destroyed and `Drained` is reported
    /// (once per pool).
    pub async fn release(&mut self, lease: LegId) -> Result<Release<T>> {
        let spent = match self.slots.get_mut(lease.slot) {
            Some(slot) if slot.active && slot.generation == lease.generation => {
                slot.active = false;
                self.active -= 1;
                if slot.uses >= self.max_uses {
                    slot.uses = 0;
                    slot.leg.take()
                } else {
                    None
                }
            }
            _ => {
                warn!(target: "tarantula::pool", "Ignoring release of unknown or stale lease {lease:?}");
                None
            }
        };

        if let Some(leg) = spent {
            debug!(
                target: "tarantula::pool",
                "Leg {} in slot {} reached {} uses, destroying",
                lease.generation, lease.slot, self.max_uses
            );
            self.destroy_leg(leg).await?;
        }

        if !self.tasks.is_empty() {
            return Ok(Release::Dispatched(self.churn().await?));
        }

        if self.active == 0 && !self.completed {
            self.drain().await?;
            self.completed = true;
            info!(target: "tarantula::pool", "Pool drained");
            return Ok(Release::Drained);
        }

        Ok(Release::Pending)
    }

    /// Destroy every leg, leased or not. Used when a run is aborted.
    pub async fn shutdown(&mut self) -> Result<()> {
        let legs: Vec<F::Leg> = self
            .slots
            .iter_mut()
            .filter_map(|slot| {
                slot.active = false;
                slot.uses = 0;
                slot.leg.take()
            })
            .collect();
        self.active = 0;
        self.tasks.clear();
        self.completed = true;

        let mut first_error = None;
        for leg in legs {
            if let Err(e) = self.destroy_leg(leg).await {
                warn!(target: "tarantula::pool", "Failed to destroy leg during shutdown: {e:#}");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    async fn churn(&mut self) -> Result<Vec<Dispatch<T>>> {
        let mut dispatched = Vec::new();
        while !self.tasks.is_empty() {
            let Some(lease) = self.acquire().await? else {
                break;
            };
            if let Some(task) = self.tasks.pop_front() {
                dispatched.push(Dispatch { task, lease });
            }
        }
        Ok(dispatched)
    }

    async fn drain(&mut self) -> Result<()> {
        let legs: Vec<F::Leg> = self
            .slots
            .iter_mut()
            .filter_map(|slot| {
                slot.uses = 0;
                slot.leg.take()
            })
            .collect();
        for leg in legs {
            self.destroy_leg(leg).await?;
        }
        Ok(())
    }

    async fn destroy_leg(&mut self, leg: F::Leg) -> Result<()> {
        self.destroyed += 1;
        self.factory
            .destroy(leg)
            .await
            .context("Failed to destroy leg")
    }
}
