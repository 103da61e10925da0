//! Clock abstraction shared by the webhook verifier and the completion waiter.
//!
//! Production code uses [`SystemClock`]. Tests inject a [`MockClock`] so replay windows and
//! poll timeouts can be exercised without real delays.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use futures::future::BoxFuture;

/// Source of time and the only place the crate suspends.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Monotonic instant, used for elapsed-time measurements.
    fn now(&self) -> Instant;

    /// Wall-clock time, used for webhook timestamps.
    fn now_system(&self) -> SystemTime;

    /// Suspends for `duration`.
    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()>;

    /// Wall-clock time as whole seconds since the unix epoch.
    fn unix_timestamp(&self) -> u64 {
        self.now_system().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn now_system(&self) -> SystemTime {
        (**self).now_system()
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()> {
        (**self).sleep(duration)
    }
}

/// Real clock backed by tokio's time driver, so paused-time tests see consistent instants.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn now_system(&self) -> SystemTime {
        SystemTime::now()
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Manually driven clock for tests.
///
/// `sleep` advances both the monotonic and the wall clock by the requested duration when first
/// polled and returns after a single yield, so a poll loop with a 1s interval runs instantly.
/// A sleep that loses a `select!` race is never polled and leaves time untouched. Clones share
/// the same underlying time.
#[derive(Debug, Clone)]
pub struct MockClock {
    monotonic_ns: Arc<AtomicU64>,
    system_ns: Arc<AtomicU64>,
    base_instant: Instant,
}

impl MockClock {
    /// Creates a clock whose wall time starts at the real current time.
    pub fn new() -> Self {
        Self::starting_at(SystemTime::now())
    }

    /// Creates a clock whose wall time starts at `start`.
    pub fn starting_at(start: SystemTime) -> Self {
        let since_epoch = start.duration_since(UNIX_EPOCH).unwrap_or_default();
        Self {
            monotonic_ns: Arc::new(AtomicU64::new(0)),
            system_ns: Arc::new(AtomicU64::new(saturating_nanos(since_epoch))),
            base_instant: Instant::now(),
        }
    }

    /// Creates a clock whose wall time starts at `secs` seconds after the unix epoch.
    pub fn at_unix(secs: u64) -> Self {
        Self::starting_at(UNIX_EPOCH + Duration::from_secs(secs))
    }

    /// Moves both clocks forward.
    pub fn advance(&self, duration: Duration) {
        let ns = saturating_nanos(duration);
        self.monotonic_ns.fetch_add(ns, Ordering::AcqRel);
        self.system_ns.fetch_add(ns, Ordering::AcqRel);
    }

    /// Sets the wall clock without touching monotonic time. May move backwards.
    pub fn set_unix(&self, secs: u64) {
        self.system_ns.store(secs.saturating_mul(1_000_000_000), Ordering::Release);
    }

    /// Total monotonic time advanced since creation.
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.monotonic_ns.load(Ordering::Acquire))
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.base_instant + self.elapsed()
    }

    fn now_system(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_nanos(self.system_ns.load(Ordering::Acquire))
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.advance(duration);
            tokio::task::yield_now().await;
        })
    }
}

fn saturating_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}
