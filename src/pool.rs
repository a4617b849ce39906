//! Bounded pools of operators and cashiers.

use std::{
    fmt::{self, Debug},
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    },
    time::Duration,
};

use tokio::{sync::Notify, time::Instant};
use tracing::debug;

/// A fixed number of interchangeable units, handed out one at a time.
///
/// Callers wait while nothing is available. Every release wakes all waiters, who then race to
/// re-check the count; whoever gets there first takes the unit.
pub struct ResourcePool {
    name: &'static str,
    capacity: usize,
    available: Mutex<usize>,
    released: Notify,
    /// Nanoseconds spent waiting, summed over every acquire.
    waited: AtomicU64,
}

impl ResourcePool {
    /// Create a pool with every unit free.
    pub fn new(name: &'static str, capacity: usize) -> Self {
        assert!(capacity > 0, "{name} pool needs at least one unit");
        Self {
            name,
            capacity,
            available: Mutex::new(capacity),
            released: Notify::new(),
            waited: AtomicU64::new(0),
        }
    }

    /// Take a unit, waiting until one is free.
    ///
    /// Cancel-safe: if the returned future is dropped before it completes, nothing was taken.
    pub async fn acquire(&self) -> Permit<'_> {
        let start = Instant::now();

        loop {
            // Register interest before checking, so a release between the check and the await
            // still wakes us.
            let released = self.released.notified();
            tokio::pin!(released);
            released.as_mut().enable();

            if self.try_take() {
                let waited = start.elapsed();
                self.waited
                    .fetch_add(waited.as_nanos() as u64, Ordering::Relaxed);
                debug!(pool = self.name, ?waited, "acquired");
                return Permit {
                    pool: self,
                    waited,
                };
            }

            released.await;
        }
    }

    fn try_take(&self) -> bool {
        let mut available = self.lock();
        if *available > 0 {
            *available -= 1;
            true
        } else {
            false
        }
    }

    fn put_back(&self) {
        {
            let mut available = self.lock();
            assert!(
                *available < self.capacity,
                "{} pool released more units than it holds",
                self.name
            );
            *available += 1;
        }
        self.released.notify_waiters();
        debug!(pool = self.name, "released");
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, usize> {
        self.available
            .lock()
            .expect("should not panic while holding lock")
    }

    /// Units not currently handed out.
    pub fn available(&self) -> usize {
        *self.lock()
    }

    /// Units currently handed out.
    pub fn in_use(&self) -> usize {
        self.capacity - self.available()
    }

    /// Get the total number of units, free or not.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Time spent waiting for this pool, summed over every acquire so far.
    pub fn total_wait(&self) -> Duration {
        Duration::from_nanos(self.waited.load(Ordering::Relaxed))
    }
}

impl Debug for ResourcePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourcePool")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("available", &self.available())
            .finish()
    }
}

/// A unit taken from a [`ResourcePool`].
///
/// Automatically returned to the pool when dropped.
#[must_use = "the unit goes straight back to the pool if the permit is dropped"]
pub struct Permit<'a> {
    pool: &'a ResourcePool,
    waited: Duration,
}

impl Permit<'_> {
    /// How long the holder waited for this unit.
    pub fn waited(&self) -> Duration {
        self.waited
    }

    /// Give the unit back.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.pool.put_back();
    }
}

impl Debug for Permit<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Permit")
            .field("pool", &self.pool.name)
            .field("waited", &self.waited)
            .finish()
    }
}
