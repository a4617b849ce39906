//! Run-wide counters, updated once per finished booking.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

/// Independent atomic accumulators. Nothing ties them together except that the three outcome
/// counts add up to the number of bookings that finished.
#[derive(Debug, Default)]
pub struct Metrics {
    successful: AtomicU64,
    failed_no_seats: AtomicU64,
    failed_payment: AtomicU64,
    revenue: AtomicU64,
    /// Nanoseconds.
    waiting: AtomicU64,
    /// Nanoseconds.
    service: AtomicU64,
}

impl Metrics {
    /// All counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_success(&self, cost: u64) {
        self.successful.fetch_add(1, Ordering::Relaxed);
        self.revenue.fetch_add(cost, Ordering::Relaxed);
    }

    pub(crate) fn record_seat_failure(&self) {
        self.failed_no_seats.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_payment_failure(&self) {
        self.failed_payment.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_wait(&self, waited: Duration) {
        self.waiting
            .fetch_add(waited.as_nanos() as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_service(&self, took: Duration) {
        self.service
            .fetch_add(took.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Read every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            successful: self.successful.load(Ordering::Relaxed),
            failed_no_seats: self.failed_no_seats.load(Ordering::Relaxed),
            failed_payment: self.failed_payment.load(Ordering::Relaxed),
            revenue: self.revenue.load(Ordering::Relaxed),
            total_wait: Duration::from_nanos(self.waiting.load(Ordering::Relaxed)),
            total_service: Duration::from_nanos(self.service.load(Ordering::Relaxed)),
        }
    }
}

/// The counters at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    /// Bookings confirmed and paid for.
    pub successful: u64,
    /// Bookings rejected up front or that found no contiguous run.
    pub failed_no_seats: u64,
    /// Bookings whose payment was declined.
    pub failed_payment: u64,
    /// Sum of every confirmed cost.
    pub revenue: u64,
    /// Operator and cashier waits, summed over every booking.
    pub total_wait: Duration,
    /// Time from calling to finishing, summed over every booking.
    pub total_service: Duration,
}

impl MetricsSnapshot {
    /// Bookings that reached a terminal state.
    pub fn finished(&self) -> u64 {
        self.successful + self.failed_no_seats + self.failed_payment
    }

    /// Mean wait per finished booking.
    pub fn mean_wait(&self) -> Duration {
        self.per_booking(self.total_wait)
    }

    /// Mean time from calling to finishing.
    pub fn mean_service(&self) -> Duration {
        self.per_booking(self.total_service)
    }

    /// Share of finished bookings with `count`, as a whole percentage rounded down.
    pub fn percentage(&self, count: u64) -> u64 {
        match self.finished() {
            0 => 0,
            finished => count * 100 / finished,
        }
    }

    fn per_booking(&self, total: Duration) -> Duration {
        match self.finished() {
            0 => Duration::ZERO,
            finished => total.div_f64(finished as f64),
        }
    }
}
