//! Leasing, recycling and draining in the leg pool

use anyhow::{Result, bail};
use futures::future::{BoxFuture, FutureExt};

use tarantula::resource_pool::{Dispatch, Release};
use tarantula::{LegFactory, LegId, ResourcePool};

/// Legs are plain serial numbers
#[derive(Default)]
struct CountingFactory {
    next: u32,
    fail: bool,
}

impl LegFactory for CountingFactory {
    type Leg = u32;

    fn create(&mut self, _slot: usize) -> BoxFuture<'_, Result<u32>> {
        async move {
            if self.fail {
                bail!("no legs today");
            }
            self.next += 1;
            Ok(self.next)
        }
        .boxed()
    }

    fn destroy(&mut self, _leg: u32) -> BoxFuture<'_, Result<()>> {
        futures::future::ready(Ok(())).boxed()
    }
}

fn pool(capacity: usize, max_uses: u32) -> ResourcePool<&'static str, CountingFactory> {
    ResourcePool::new(CountingFactory::default(), capacity, max_uses)
}

fn tasks(dispatched: &[Dispatch<&'static str>]) -> Vec<&'static str> {
    dispatched.iter().map(|d| d.task).collect()
}

#[tokio::test]
async fn dispatch_is_bounded_by_capacity() {
    let mut pool = pool(2, 10);

    let dispatched = pool.enqueue(["a", "b", "c", "d", "e"]).await.unwrap();

    assert_eq!(tasks(&dispatched), ["a", "b"]);
    assert_eq!(pool.active(), 2);
    assert_eq!(pool.pending(), 3);
    assert!(pool.acquire().await.unwrap().is_none());
}

#[tokio::test]
async fn released_leg_takes_the_oldest_waiting_task() {
    let mut pool = pool(2, 10);
    let first = pool.enqueue(["a", "b", "c", "d"]).await.unwrap();

    match pool.release(first[1].lease).await.unwrap() {
        Release::Dispatched(next) => {
            assert_eq!(tasks(&next), ["c"]);
            assert_eq!(next[0].lease, first[1].lease);
        }
        other => panic!("expected dispatch, got {other:?}"),
    }
    match pool.release(first[0].lease).await.unwrap() {
        Release::Dispatched(next) => assert_eq!(tasks(&next), ["d"]),
        other => panic!("expected dispatch, got {other:?}"),
    }
    assert_eq!(pool.stats().created, 2);
}

#[tokio::test]
async fn spent_legs_are_replaced() {
    let mut pool = pool(1, 2);
    let first = pool.enqueue(["a", "b", "c"]).await.unwrap();
    let lease = first[0].lease;

    let Release::Dispatched(second) = pool.release(lease).await.unwrap() else {
        panic!("expected dispatch");
    };
    assert_eq!(second[0].lease, lease);

    let Release::Dispatched(third) = pool.release(lease).await.unwrap() else {
        panic!("expected dispatch");
    };
    assert_eq!(third[0].lease.slot, lease.slot);
    assert_ne!(third[0].lease.generation, lease.generation);

    let stats = pool.stats();
    assert_eq!(stats.created, 2);
    assert_eq!(stats.destroyed, 1);
}

#[tokio::test]
async fn drained_is_reported_once() {
    let mut pool = pool(2, 10);
    let dispatched = pool.enqueue(["a", "b"]).await.unwrap();

    assert!(matches!(
        pool.release(dispatched[0].lease).await.unwrap(),
        Release::Pending
    ));
    assert!(matches!(
        pool.release(dispatched[1].lease).await.unwrap(),
        Release::Drained
    ));
    assert!(pool.is_completed());
    assert_eq!(pool.stats().live_legs, 0);
    assert_eq!(pool.stats().destroyed, 2);

    // a late duplicate release must not report a second drain
    assert!(matches!(
        pool.release(dispatched[1].lease).await.unwrap(),
        Release::Pending
    ));
    assert!(pool.enqueue(["late"]).await.is_err());
}

#[tokio::test]
async fn stale_lease_is_ignored() {
    let mut pool = pool(2, 10);
    pool.enqueue(["a", "b"]).await.unwrap();

    let bogus = LegId {
        slot: 0,
        generation: 99,
    };
    assert!(matches!(pool.release(bogus).await.unwrap(), Release::Pending));
    assert_eq!(pool.active(), 2);
    assert!(pool.leg_mut(bogus).is_none());
}

#[tokio::test]
async fn shutdown_destroys_leased_legs() {
    let mut pool = pool(3, 10);
    pool.enqueue(["a", "b", "c", "d"]).await.unwrap();

    pool.shutdown().await.unwrap();

    let stats = pool.stats();
    assert_eq!(stats.active, 0);
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.live_legs, 0);
    assert_eq!(stats.destroyed, 3);
    assert!(pool.is_completed());
}

#[tokio::test]
async fn factory_failure_surfaces_from_enqueue() {
    let mut pool: ResourcePool<&'static str, _> = ResourcePool::new(
        CountingFactory {
            fail: true,
            ..CountingFactory::default()
        },
        1,
        1,
    );

    let err = pool.enqueue(["a"]).await.unwrap_err();
    assert!(format!("{err:#}").contains("no legs today"));
    assert_eq!(pool.active(), 0);
}

#[tokio::test]
async fn zero_capacity_is_clamped_to_one() {
    let mut pool = pool(0, 0);
    assert_eq!(pool.capacity(), 1);

    let dispatched = pool.enqueue(["a", "b"]).await.unwrap();
    assert_eq!(dispatched.len(), 1);
    assert_eq!(pool.leg_mut(dispatched[0].lease).copied(), Some(1));
}

/// Leg that may move between threads but not be shared
struct CellLeg(std::cell::Cell<u32>);

struct CellFactory;

impl LegFactory for CellFactory {
    type Leg = CellLeg;

    fn create(&mut self, slot: usize) -> BoxFuture<'_, Result<CellLeg>> {
        let id = u32::try_from(slot).unwrap_or(u32::MAX);
        futures::future::ready(Ok(CellLeg(std::cell::Cell::new(id)))).boxed()
    }

    fn destroy(&mut self, _leg: CellLeg) -> BoxFuture<'_, Result<()>> {
        futures::future::ready(Ok(())).boxed()
    }
}

#[tokio::test]
async fn pool_with_unshareable_legs_runs_on_spawned_tasks() {
    let handle = tokio::spawn(async move {
        let mut pool: ResourcePool<&'static str, _> = ResourcePool::new(CellFactory, 2, 1);
        let dispatched = pool.enqueue(["a", "b", "c"]).await?;
        let first = dispatched[0].lease;
        let slot = pool.leg_mut(first).map(|leg| leg.0.get());
        let release = pool.release(first).await?;
        anyhow::Ok((dispatched.len(), slot, matches!(release, Release::Dispatched(_))))
    });

    let (dispatched, slot, redispatched) = handle.await.unwrap().unwrap();
    assert_eq!(dispatched, 2);
    assert_eq!(slot, Some(0));
    assert!(redispatched);
}
