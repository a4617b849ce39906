//! The seat map and contiguous-run allocation.

use std::{
    fmt::{self, Debug},
    ops::Range,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex, MutexGuard,
    },
};

use tracing::warn;

use crate::{
    config::CinemaConfig,
    request::{CustomerId, TransactionId},
};

/// Who, if anyone, a seat belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seat {
    /// Free to book.
    Empty,
    /// Provisionally reserved while the transaction pays.
    Held(TransactionId),
    /// Paid for.
    Confirmed(CustomerId),
}

/// A fixed block of numbered seats, laid out in rows of equal width.
///
/// Each row has its own lock. A reservation never crosses a row boundary, so two attempts on
/// overlapping ranges always contend on the same lock, while searches in different rows don't
/// serialize.
pub struct SeatMap {
    row_width: usize,
    rows: Vec<Mutex<Vec<Seat>>>,
    /// Empty seats. Updated under the owning row's lock, readable without one.
    available: AtomicUsize,
}

impl SeatMap {
    /// An empty map sized and laid out from `config`.
    pub fn new(config: &CinemaConfig) -> Self {
        let row_width = config.row_width();
        let row_count = config.total_seats() / row_width;
        Self {
            row_width,
            rows: (0..row_count)
                .map(|_| Mutex::new(vec![Seat::Empty; row_width]))
                .collect(),
            available: AtomicUsize::new(row_count * row_width),
        }
    }

    /// Total number of seats.
    pub fn len(&self) -> usize {
        self.rows.len() * self.row_width
    }

    /// Whether the map has no seats at all.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// How many seats are empty.
    ///
    /// Read without taking any row lock, so it can be stale by the time the caller acts on it.
    pub fn available(&self) -> usize {
        self.available.load(Ordering::SeqCst)
    }

    /// Scan `zone` left to right for the first run of `count` empty seats within one row and
    /// hold it for `transaction`.
    pub fn find_contiguous(
        &self,
        zone: Range<usize>,
        count: usize,
        transaction: TransactionId,
    ) -> Option<SeatHold<'_>> {
        if count == 0 || zone.len() < count {
            return None;
        }

        for start in zone.start..=zone.end - count {
            let left_in_row = self.row_width - start % self.row_width;
            if left_in_row < count {
                continue;
            }
            if let Some(hold) = self.try_reserve_at(start, count, transaction) {
                return Some(hold);
            }
        }

        None
    }

    /// Hold `[start, start + count)` for `transaction` if every seat in it is empty.
    ///
    /// The check and the update happen under one lock. Ranges that leave the map or cross a
    /// row boundary are never reserved.
    pub fn try_reserve_at(
        &self,
        start: usize,
        count: usize,
        transaction: TransactionId,
    ) -> Option<SeatHold<'_>> {
        if count == 0 || start + count > self.len() {
            return None;
        }
        let offset = start % self.row_width;
        if offset + count > self.row_width {
            return None;
        }

        let mut row = self.row(start);
        let run = &mut row[offset..offset + count];
        if run.iter().any(|seat| *seat != Seat::Empty) {
            return None;
        }
        run.fill(Seat::Held(transaction));
        self.available.fetch_sub(count, Ordering::SeqCst);

        Some(SeatHold {
            seats: self,
            transaction,
            indices: (start..start + count).collect(),
            settled: false,
        })
    }

    /// Empty every listed seat that is still held by `transaction`.
    ///
    /// Seats in any other state are left alone, so repeating a rollback restores nothing.
    /// Returns how many seats were restored.
    pub fn rollback(&self, transaction: TransactionId, indices: &[usize]) -> usize {
        let mut restored = 0;
        for &index in indices.iter().filter(|&&index| index < self.len()) {
            let mut row = self.row(index);
            let seat = &mut row[index % self.row_width];
            if *seat == Seat::Held(transaction) {
                *seat = Seat::Empty;
                self.available.fetch_add(1, Ordering::SeqCst);
                restored += 1;
            }
        }
        restored
    }

    fn confirm(&self, transaction: TransactionId, customer: CustomerId, indices: &[usize]) {
        for &index in indices {
            let mut row = self.row(index);
            let seat = &mut row[index % self.row_width];
            assert_eq!(
                *seat,
                Seat::Held(transaction),
                "only held seats can be confirmed"
            );
            *seat = Seat::Confirmed(customer);
        }
    }

    /// Who owns what, in seat order.
    pub fn snapshot(&self) -> Vec<Seat> {
        self.rows
            .iter()
            .flat_map(|row| {
                row.lock()
                    .expect("should not panic while holding lock")
                    .clone()
            })
            .collect()
    }

    fn row(&self, index: usize) -> MutexGuard<'_, Vec<Seat>> {
        self.rows[index / self.row_width]
            .lock()
            .expect("should not panic while holding lock")
    }
}

impl Debug for SeatMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeatMap")
            .field("seats", &self.len())
            .field("available", &self.available())
            .finish()
    }
}

/// Seats held for one transaction.
///
/// Settle it with [`confirm`](SeatHold::confirm) or [`release`](SeatHold::release). If it is
/// dropped unsettled (e.g. the task was cancelled mid-payment) the seats are rolled back.
#[must_use = "the seats are rolled back if the hold is dropped"]
pub struct SeatHold<'a> {
    seats: &'a SeatMap,
    transaction: TransactionId,
    indices: Vec<usize>,
    settled: bool,
}

impl SeatHold<'_> {
    /// The held seat indices, contiguous and within one row.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// The transaction the seats are held for.
    pub fn transaction(&self) -> TransactionId {
        self.transaction
    }

    /// Hand the seats to `customer` for good.
    pub fn confirm(mut self, customer: CustomerId) {
        self.seats.confirm(self.transaction, customer, &self.indices);
        self.settled = true;
    }

    /// Give the seats back. Returns how many were restored.
    pub fn release(mut self) -> usize {
        self.settled = true;
        self.seats.rollback(self.transaction, &self.indices)
    }
}

impl Drop for SeatHold<'_> {
    fn drop(&mut self) {
        if !self.settled {
            let restored = self.seats.rollback(self.transaction, &self.indices);
            warn!(
                transaction = %self.transaction,
                restored, "Rolled back seats held by an unfinished booking"
            );
        }
    }
}

impl Debug for SeatHold<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeatHold")
            .field("transaction", &self.transaction)
            .field("indices", &self.indices)
            .finish()
    }
}
