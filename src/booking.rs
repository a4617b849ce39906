use std::sync::atomic::{AtomicU64, Ordering};

use tokio::time::Instant;
use tracing::{debug, field, info, info_span, Instrument, Span};

use crate::{
    config::{CinemaConfig, Zone},
    error::ConfigError,
    metrics::Metrics,
    pool::{Permit, ResourcePool},
    random::SharedRandom,
    request::{BookingState, CustomerId, CustomerRequest, TransactionId},
    seats::{Seat, SeatHold, SeatMap},
};

/// Coordinates customers competing for operators, seats and cashiers.
///
/// Share one engine between all customer tasks (e.g. in an `Arc`). The operator pool, cashier
/// pool and seat map are independent critical sections and no lock from one is held while
/// waiting on another.
///
/// Each customer goes through:
///
/// 1. [`acquire_operator`](Self::acquire_operator)
/// 2. [`find_seats`](Self::find_seats), or [`reject`](Self::reject) if
///    [`seats_available`](Self::seats_available) says the cinema is full
/// 3. release the operator
/// 4. on success, [`acquire_cashier`](Self::acquire_cashier),
///    [`process_payment`](Self::process_payment), then release the cashier
///
/// [`book`](Self::book) runs the whole sequence.
#[derive(Debug)]
pub struct BookingEngine {
    config: CinemaConfig,
    random: SharedRandom,
    operators: ResourcePool,
    cashiers: ResourcePool,
    seats: SeatMap,
    metrics: Metrics,
    next_transaction: AtomicU64,
}

impl BookingEngine {
    /// Set up an empty cinema with every operator and cashier free.
    pub fn new(config: CinemaConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            random: SharedRandom::new(seed),
            operators: ResourcePool::new("operator", config.operators()),
            cashiers: ResourcePool::new("cashier", config.cashiers()),
            seats: SeatMap::new(&config),
            metrics: Metrics::new(),
            next_transaction: AtomicU64::new(0),
            config,
        })
    }

    /// Take one customer from calling in to a terminal state.
    ///
    /// Cancel-safe: dropping the future part way through returns any operator or cashier and
    /// rolls back held seats. Nothing is recorded in the metrics for a cancelled booking, not
    /// even the time it spent waiting.
    pub async fn book(&self, customer: CustomerId) -> CustomerRequest {
        let span = info_span!(
            "booking",
            customer.id = customer.0,
            transaction = field::Empty
        );
        self.run_booking(customer).instrument(span).await
    }

    async fn run_booking(&self, customer: CustomerId) -> CustomerRequest {
        let started = Instant::now();
        let mut request = CustomerRequest::new(customer);
        info!("{customer} is calling");

        let operator = self.acquire_operator(&mut request).await;

        if !self.seats_available() {
            self.reject(&mut request);
            operator.release();
        } else {
            let hold = self.find_seats(&mut request).await;
            operator.release();

            if let Some(hold) = hold {
                let cashier = self.acquire_cashier(&mut request).await;
                self.process_payment(&mut request, hold).await;
                cashier.release();
            }
        }

        debug_assert!(request.state().is_terminal());
        self.metrics.record_wait(request.waited());
        self.metrics.record_service(started.elapsed());
        request
    }

    /// Wait for an operator and open a transaction.
    pub async fn acquire_operator(&self, request: &mut CustomerRequest) -> Permit<'_> {
        let operator = self.operators.acquire().await;

        let transaction = TransactionId(self.next_transaction.fetch_add(1, Ordering::SeqCst));
        request.assign_transaction(transaction);
        Span::current().record("transaction", transaction.0);

        request.waited += operator.waited();
        info!(waited = ?operator.waited(), "Acquired operator");

        operator
    }

    /// Cheap check of whether any seat at all is empty.
    ///
    /// The count is read without the seat map's locks, so it can be stale: a customer may be
    /// turned away just before seats are released, or sent to search when the last seats were
    /// taken a moment ago. The search itself is always exact.
    pub fn seats_available(&self) -> bool {
        self.seats.available() > 0
    }

    /// Turn the customer away without searching.
    pub fn reject(&self, request: &mut CustomerRequest) {
        request.advance(BookingState::RejectedNoSeats);
        self.metrics.record_seat_failure();
        info!("No seats available for booking");
    }

    /// Decide what the customer wants, take time to look, then hold the first contiguous run
    /// that fits.
    ///
    /// Requires an operator. Returns the held seats, or `None` after recording a seat failure.
    pub async fn find_seats(&self, request: &mut CustomerRequest) -> Option<SeatHold<'_>> {
        let transaction = request
            .transaction()
            .expect("an operator should open the transaction before searching");
        request.advance(BookingState::Searching);

        let count = self
            .random
            .between(self.config.min_seats, self.config.max_seats);
        let zone = if self.random.chance(self.config.zone_a_probability) {
            Zone::A
        } else {
            Zone::B
        };
        request.requested_seats = count;
        request.zone = Some(zone);
        info!(seats = count, %zone, "Looking for seats");

        // No seat locks are held while the operator looks.
        let searching = self.random.delay(&self.config.search_delay);
        tokio::time::sleep(searching).await;

        match self
            .seats
            .find_contiguous(self.config.zone_range(zone), count, transaction)
        {
            Some(hold) => {
                request.seats = hold.indices().to_vec();
                request.advance(BookingState::SeatsFound);
                info!(seats = ?seat_numbers(hold.indices()), "Found seats, proceeding to payment");
                Some(hold)
            }
            None => {
                request.seats.clear();
                request.advance(BookingState::SeatsNotFound);
                self.metrics.record_seat_failure();
                info!("Unfortunately there are no seats available");
                None
            }
        }
    }

    /// Wait for a cashier to take the payment for seats already held.
    pub async fn acquire_cashier(&self, request: &mut CustomerRequest) -> Permit<'_> {
        let cashier = self.cashiers.acquire().await;

        request.waited += cashier.waited();
        request.advance(BookingState::Paying);
        info!(waited = ?cashier.waited(), "Acquired cashier");

        cashier
    }

    /// Charge the customer and settle the held seats either way.
    ///
    /// Requires a cashier. The outcome doesn't depend on the amount.
    pub async fn process_payment(
        &self,
        request: &mut CustomerRequest,
        hold: SeatHold<'_>,
    ) -> BookingState {
        debug_assert_eq!(request.state(), BookingState::Paying);
        debug_assert_eq!(request.seats(), hold.indices());

        let paying = self.random.delay(&self.config.payment_delay);
        tokio::time::sleep(paying).await;

        let zone = request
            .zone()
            .expect("a zone should be chosen before seats are held");
        let cost = request.requested_seats() as u64 * self.config.price(zone);
        request.cost = cost;

        if self.random.chance(self.config.payment_success_probability) {
            hold.confirm(request.customer());
            self.metrics.record_success(cost);
            request.advance(BookingState::Confirmed);
            info!(cost, "Payment successful, seats confirmed");
        } else {
            let restored = hold.release();
            self.metrics.record_payment_failure();
            request.advance(BookingState::PaymentFailed);
            info!(cost, "Payment failed, booking cancelled");
            debug!(restored, "Released held seats");
        }

        request.state()
    }

    /// The validated configuration this engine runs with.
    pub fn config(&self) -> &CinemaConfig {
        &self.config
    }

    /// The random stream shared by every booking.
    pub fn random(&self) -> &SharedRandom {
        &self.random
    }

    /// The operator pool.
    pub fn operators(&self) -> &ResourcePool {
        &self.operators
    }

    /// The cashier pool.
    pub fn cashiers(&self) -> &ResourcePool {
        &self.cashiers
    }

    /// The live seat map.
    pub fn seats(&self) -> &SeatMap {
        &self.seats
    }

    /// Counters for every booking finished so far.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Who owns each seat right now.
    pub fn seat_plan(&self) -> Vec<Seat> {
        self.seats.snapshot()
    }

    /// How many transactions have been opened.
    ///
    /// Counts cancelled bookings too, so it can exceed the finished outcomes in the metrics.
    pub fn transactions(&self) -> u64 {
        self.next_transaction.load(Ordering::SeqCst)
    }
}

/// 1-based seat numbers, as shown to customers.
fn seat_numbers(indices: &[usize]) -> Vec<usize> {
    indices.iter().map(|i| i + 1).collect()
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use assert_matches::assert_matches;

    use super::*;
    use crate::config::DelayRange;

    fn quick() -> CinemaConfig {
        CinemaConfig::builder()
            .search_delay(DelayRange::from_secs(1, 2))
            .payment_delay(DelayRange::from_secs(1, 2))
            .payment_success_probability(1.0)
            .build()
    }

    #[tokio::test(start_paused = true)]
    async fn confirmed_booking() {
        let engine = BookingEngine::new(quick(), 1).unwrap();

        let request = engine.book(CustomerId(1)).await;

        assert_eq!(request.state(), BookingState::Confirmed);
        assert_eq!(request.transaction(), Some(TransactionId(0)));

        let zone = request.zone().unwrap();
        let count = request.requested_seats();
        assert!((1..=5).contains(&count));
        assert_eq!(request.seats().len(), count);
        assert_eq!(request.cost(), count as u64 * engine.config().price(zone));

        let plan = engine.seat_plan();
        for &seat in request.seats() {
            assert_eq!(plan[seat], Seat::Confirmed(CustomerId(1)));
            assert!(engine.config().zone_range(zone).contains(&seat));
        }

        let metrics = engine.metrics().snapshot();
        assert_eq!(metrics.successful, 1);
        assert_eq!(metrics.revenue, request.cost());
        assert_eq!(engine.operators().available(), 3);
        assert_eq!(engine.cashiers().available(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn declined_payment_releases_seats() {
        let config = CinemaConfig::builder()
            .search_delay(DelayRange::ZERO)
            .payment_delay(DelayRange::ZERO)
            .payment_success_probability(0.0)
            .build();
        let engine = BookingEngine::new(config, 5).unwrap();

        let request = engine.book(CustomerId(1)).await;

        assert_eq!(request.state(), BookingState::PaymentFailed);
        assert!(request.cost() > 0);
        assert_eq!(engine.seats().available(), 300);
        assert!(engine.seat_plan().iter().all(|s| *s == Seat::Empty));

        let metrics = engine.metrics().snapshot();
        assert_eq!(metrics.failed_payment, 1);
        assert_eq!(metrics.revenue, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn full_cinema_rejects_early() {
        let config = CinemaConfig::builder()
            .row_width(1)
            .zone_a_rows(1)
            .zone_b_rows(0)
            .zone_a_probability(1.0)
            .max_seats(1)
            .search_delay(DelayRange::ZERO)
            .payment_delay(DelayRange::ZERO)
            .payment_success_probability(1.0)
            .build();
        let engine = BookingEngine::new(config, 0).unwrap();

        let first = engine.book(CustomerId(1)).await;
        let second = engine.book(CustomerId(2)).await;

        assert_eq!(first.state(), BookingState::Confirmed);
        assert_eq!(second.state(), BookingState::RejectedNoSeats);
        assert_eq!(second.transaction(), Some(TransactionId(1)));
        assert_eq!(engine.operators().available(), 3);
        assert_eq!(engine.metrics().snapshot().failed_no_seats, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_zone_finds_nothing() {
        let config = CinemaConfig::builder()
            .zone_b_rows(0)
            .zone_a_probability(0.0)
            .search_delay(DelayRange::ZERO)
            .build();
        let engine = BookingEngine::new(config, 0).unwrap();

        let request = engine.book(CustomerId(1)).await;

        assert_eq!(request.state(), BookingState::SeatsNotFound);
        assert_eq!(request.zone(), Some(Zone::B));
        assert!(request.seats().is_empty());
        assert_eq!(engine.metrics().snapshot().failed_no_seats, 1);
    }

    /// Driving the lifecycle one step at a time.
    #[tokio::test(start_paused = true)]
    async fn step_by_step() {
        let engine = BookingEngine::new(quick(), 2).unwrap();
        let mut request = CustomerRequest::new(CustomerId(4));

        let operator = engine.acquire_operator(&mut request).await;
        assert_eq!(engine.operators().in_use(), 1);
        assert!(engine.seats_available());

        let hold = engine.find_seats(&mut request).await.unwrap();
        assert_eq!(request.state(), BookingState::SeatsFound);
        operator.release();
        assert_eq!(engine.operators().in_use(), 0);

        let cashier = engine.acquire_cashier(&mut request).await;
        assert_eq!(engine.cashiers().in_use(), 1);
        let state = engine.process_payment(&mut request, hold).await;
        cashier.release();

        assert_eq!(state, BookingState::Confirmed);
        assert_eq!(engine.cashiers().in_use(), 0);
    }

    /// Given a booking part way through payment
    /// When its task is aborted
    /// Then the cashier and the held seats should be returned
    #[tokio::test(start_paused = true)]
    async fn cancelled_during_payment() {
        let config = CinemaConfig::builder()
            .search_delay(DelayRange::fixed(Duration::from_secs(1)))
            .payment_delay(DelayRange::fixed(Duration::from_secs(10)))
            .build();
        let engine = Arc::new(BookingEngine::new(config, 3).unwrap());

        let handle = tokio::spawn({
            let engine = Arc::clone(&engine);
            async move { engine.book(CustomerId(1)).await }
        });

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(engine.cashiers().in_use(), 1);
        assert!(engine.seats().available() < 300);

        handle.abort();
        assert_matches!(handle.await, Err(e) if e.is_cancelled());

        assert_eq!(engine.cashiers().available(), 2);
        assert_eq!(engine.operators().available(), 3);
        assert_eq!(engine.seats().available(), 300);
        assert!(engine.seat_plan().iter().all(|s| *s == Seat::Empty));

        let metrics = engine.metrics().snapshot();
        assert_eq!(metrics.finished(), 0);
        assert_eq!(metrics.total_wait, Duration::ZERO);
    }

    /// Given a single operator, with a second customer queued behind the first
    /// When both are aborted, the second after it has waited and started searching
    /// Then the operator should be returned and none of the waiting should be counted
    #[tokio::test(start_paused = true)]
    async fn cancelled_while_searching() {
        let config = CinemaConfig::builder()
            .operators(1)
            .search_delay(DelayRange::fixed(Duration::from_secs(10)))
            .build();
        let engine = Arc::new(BookingEngine::new(config, 3).unwrap());

        let spawn = |id| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.book(CustomerId(id)).await })
        };
        let first = spawn(1);
        tokio::task::yield_now().await;
        let second = spawn(2);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(engine.operators().in_use(), 1);

        first.abort();
        assert!(first.await.unwrap_err().is_cancelled());

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(engine.operators().in_use(), 1);
        assert_eq!(engine.operators().total_wait(), Duration::from_secs(5));

        second.abort();
        assert!(second.await.unwrap_err().is_cancelled());
        assert_eq!(engine.operators().available(), 1);

        let metrics = engine.metrics().snapshot();
        assert_eq!(metrics.finished(), 0);
        assert_eq!(metrics.total_wait, Duration::ZERO);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = CinemaConfig::builder().operators(0).build();
        assert_matches!(
            BookingEngine::new(config, 0),
            Err(ConfigError::EmptyPool("operator"))
        );
    }
}
