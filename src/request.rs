use std::{
    fmt::{self, Display},
    time::Duration,
};

use crate::config::Zone;

/// Identifies a customer. Customers are numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CustomerId(pub u64);

/// Assigned when a customer gets through to an operator. Unique within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(pub u64);

impl Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Customer {}", self.0)
    }
}

impl Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a booking has got to.
///
/// ```text
/// Calling -> RejectedNoSeats
///         -> Searching -> SeatsNotFound
///                      -> SeatsFound -> Paying -> Confirmed
///                                              -> PaymentFailed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingState {
    /// Waiting for an operator.
    Calling,
    /// Turned away because the cinema looked full.
    RejectedNoSeats,
    /// An operator is looking for seats.
    Searching,
    /// No contiguous run was free in the requested zone.
    SeatsNotFound,
    /// Seats are held, waiting for a cashier.
    SeatsFound,
    /// A cashier is processing the payment.
    Paying,
    /// Paid and the seats are confirmed.
    Confirmed,
    /// The payment was declined and the seats released.
    PaymentFailed,
}

impl BookingState {
    /// No further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingState::RejectedNoSeats
                | BookingState::SeatsNotFound
                | BookingState::Confirmed
                | BookingState::PaymentFailed
        )
    }

    /// A terminal failure caused by a lack of seats.
    pub fn is_seat_failure(&self) -> bool {
        matches!(
            self,
            BookingState::RejectedNoSeats | BookingState::SeatsNotFound
        )
    }

    fn can_become(&self, next: BookingState) -> bool {
        use BookingState::*;
        matches!(
            (self, next),
            (Calling, RejectedNoSeats)
                | (Calling, Searching)
                | (Searching, SeatsNotFound)
                | (Searching, SeatsFound)
                | (SeatsFound, Paying)
                | (Paying, Confirmed)
                | (Paying, PaymentFailed)
        )
    }
}

impl Display for BookingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BookingState::Calling => "calling",
            BookingState::RejectedNoSeats => "rejected, no seats available",
            BookingState::Searching => "searching",
            BookingState::SeatsNotFound => "failed, seats not found",
            BookingState::SeatsFound => "seats found",
            BookingState::Paying => "paying",
            BookingState::Confirmed => "confirmed",
            BookingState::PaymentFailed => "failed, payment declined",
        })
    }
}

/// Everything recorded about one customer's attempt to book.
#[derive(Debug, Clone)]
pub struct CustomerRequest {
    pub(crate) customer: CustomerId,
    pub(crate) transaction: Option<TransactionId>,
    pub(crate) requested_seats: usize,
    pub(crate) zone: Option<Zone>,
    pub(crate) seats: Vec<usize>,
    pub(crate) cost: u64,
    pub(crate) state: BookingState,
    pub(crate) waited: Duration,
}

impl CustomerRequest {
    /// A customer who has just called in.
    pub fn new(customer: CustomerId) -> Self {
        Self {
            customer,
            transaction: None,
            requested_seats: 0,
            zone: None,
            seats: Vec::new(),
            cost: 0,
            state: BookingState::Calling,
            waited: Duration::ZERO,
        }
    }

    /// Who is booking.
    pub fn customer(&self) -> CustomerId {
        self.customer
    }

    /// Set once, when an operator picks up.
    pub fn transaction(&self) -> Option<TransactionId> {
        self.transaction
    }

    /// How many seats the customer asked for, or zero before the search.
    pub fn requested_seats(&self) -> usize {
        self.requested_seats
    }

    /// The zone the customer asked for, once chosen.
    pub fn zone(&self) -> Option<Zone> {
        self.zone
    }

    /// The seat indices that were held. Left in place after a rollback, but only meaningful
    /// while the state is [`SeatsFound`](BookingState::SeatsFound), `Paying` or `Confirmed`.
    pub fn seats(&self) -> &[usize] {
        &self.seats
    }

    /// What the customer was charged, or would have been had the payment gone through.
    pub fn cost(&self) -> u64 {
        self.cost
    }

    /// Where the booking is in its lifecycle.
    pub fn state(&self) -> BookingState {
        self.state
    }

    /// Time spent waiting for an operator and a cashier.
    pub fn waited(&self) -> Duration {
        self.waited
    }

    pub(crate) fn assign_transaction(&mut self, transaction: TransactionId) {
        assert!(
            self.transaction.is_none(),
            "transaction number is assigned once"
        );
        self.transaction = Some(transaction);
    }

    pub(crate) fn advance(&mut self, next: BookingState) {
        assert!(
            self.state.can_become(next),
            "invalid booking transition from {:?} to {:?}",
            self.state,
            next
        );
        self.state = next;
    }
}
