use std::{sync::Arc, time::Duration};

use cinema_booking::{
    BookingEngine, BookingState, CinemaConfig, CustomerId, DelayRange, Seat, Simulation, Zone,
};
use futures::future::join_all;

mod types;

use types::{assert_no_double_booking, assert_valid_seats};

/// Given a cinema with a single seat
/// When two customers both ask for it at once
/// Then exactly one should get it and the other should fail for lack of seats
#[tokio::test(start_paused = true)]
async fn one_seat_two_customers() {
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
    let engine = BookingEngine::new(config, 99).unwrap();

    let (r1, r2) = tokio::join!(engine.book(CustomerId(1)), engine.book(CustomerId(2)));

    let (winner, loser) = if r1.state() == BookingState::Confirmed {
        (r1, r2)
    } else {
        (r2, r1)
    };
    assert_eq!(winner.state(), BookingState::Confirmed);
    assert_eq!(winner.seats(), &[0]);
    assert!(loser.state().is_seat_failure(), "got {}", loser.state());

    assert_eq!(engine.seat_plan(), vec![Seat::Confirmed(winner.customer())]);

    let metrics = engine.metrics().snapshot();
    assert_eq!(metrics.successful, 1);
    assert_eq!(metrics.failed_no_seats, 1);
}

/// Given a single operator and a fixed 5s search
/// When three customers call at the same moment
/// Then they should be served one at a time, waiting 0s, 5s and 10s
#[tokio::test(start_paused = true)]
async fn single_operator_serializes_searches() {
    let search = Duration::from_secs(5);
    let config = CinemaConfig::builder()
        .operators(1)
        .search_delay(DelayRange::fixed(search))
        .payment_delay(DelayRange::ZERO)
        .payment_success_probability(1.0)
        .build();
    let engine = Arc::new(BookingEngine::new(config, 8).unwrap());

    let tasks = (1..=3).map(|id| {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.book(CustomerId(id)).await })
    });
    let requests: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    let mut waits: Vec<_> = requests.iter().map(|r| r.waited()).collect();
    waits.sort();
    assert_eq!(waits, vec![Duration::ZERO, search, search * 2]);

    let metrics = engine.metrics().snapshot();
    assert_eq!(metrics.total_wait, search + search * 2);
    assert_eq!(engine.operators().total_wait(), search * 3);
    assert_eq!(metrics.successful, 3);

    let mut transactions: Vec<_> = requests.iter().map(|r| r.transaction().unwrap().0).collect();
    transactions.sort();
    assert_eq!(transactions, vec![0, 1, 2]);
}

/// Given every payment is declined
/// When many customers book
/// Then every booking that reached payment should fail and leave its seats empty
#[tokio::test(start_paused = true)]
async fn declined_payments_release_every_seat() {
    let config = CinemaConfig::builder()
        .search_delay(DelayRange::from_secs(1, 3))
        .payment_delay(DelayRange::from_secs(1, 3))
        .payment_success_probability(0.0)
        .build();
    let engine = Arc::new(BookingEngine::new(config, 17).unwrap());

    let tasks = (1..=50).map(|id| {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.book(CustomerId(id)).await })
    });
    let requests: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    assert!(requests
        .iter()
        .all(|r| r.state() == BookingState::PaymentFailed));

    let metrics = engine.metrics().snapshot();
    assert_eq!(metrics.failed_payment, 50);
    assert_eq!(metrics.revenue, 0);
    assert_eq!(engine.seats().available(), 300);
    assert!(engine.seat_plan().iter().all(|s| *s == Seat::Empty));
}

/// A full run with the reference configuration.
#[tokio::test(start_paused = true)]
async fn reference_run_adds_up() {
    let simulation = Simulation::new(CinemaConfig::default(), 80, 1234).unwrap();
    let config = simulation.engine().config().clone();

    let report = simulation.run().await.unwrap();
    let metrics = report.metrics;

    assert_eq!(metrics.finished(), 80);
    assert_eq!(report.transactions, 80);

    let confirmed: Vec<_> = report
        .requests
        .iter()
        .filter(|r| r.state() == BookingState::Confirmed)
        .collect();
    assert_eq!(confirmed.len() as u64, metrics.successful);
    assert_eq!(
        confirmed.iter().map(|r| r.cost()).sum::<u64>(),
        metrics.revenue
    );
    for request in &confirmed {
        assert_valid_seats(&config, request);
    }

    let failed_payment = report
        .requests
        .iter()
        .filter(|r| r.state() == BookingState::PaymentFailed)
        .count();
    assert_eq!(failed_payment as u64, metrics.failed_payment);

    assert_eq!(
        report.requests.iter().map(|r| r.waited()).sum::<Duration>(),
        metrics.total_wait
    );
    assert_no_double_booking(&report.requests, &report.seats);
}

/// Given a fixed seed
/// When customers book one after another
/// Then the same choices and outcomes should come out every time
#[tokio::test(start_paused = true)]
async fn sequential_runs_are_reproducible() {
    type Outcome = (BookingState, Option<Zone>, Vec<usize>, u64);

    async fn run(seed: u64) -> Vec<Outcome> {
        let engine = BookingEngine::new(CinemaConfig::default(), seed).unwrap();
        let mut outcomes = Vec::new();
        for id in 1..=30 {
            let request = engine.book(CustomerId(id)).await;
            outcomes.push((
                request.state(),
                request.zone(),
                request.seats().to_vec(),
                request.cost(),
            ));
        }
        outcomes
    }

    assert_eq!(run(2024).await, run(2024).await);
}
