use std::collections::HashSet;

use cinema_booking::{BookingState, CinemaConfig, CustomerRequest, Seat};

/// A confirmed request holds a contiguous run, within one row of the zone it asked for.
pub fn assert_valid_seats(config: &CinemaConfig, request: &CustomerRequest) {
    let seats = request.seats();
    let zone = request.zone().expect("confirmed requests have a zone");

    assert_eq!(seats.len(), request.requested_seats());
    assert!(seats.windows(2).all(|w| w[1] == w[0] + 1), "not contiguous: {seats:?}");

    let row = seats[0] / config.row_width();
    assert!(
        seats.iter().all(|s| s / config.row_width() == row),
        "crosses a row: {seats:?}"
    );
    assert!(
        seats.iter().all(|s| config.zone_range(zone).contains(s)),
        "outside {zone}: {seats:?}"
    );
}

/// Every confirmed request owns exactly its seats in the final plan, and no seat is shared.
pub fn assert_no_double_booking(requests: &[CustomerRequest], plan: &[Seat]) {
    let mut taken = HashSet::new();

    for request in requests
        .iter()
        .filter(|r| r.state() == BookingState::Confirmed)
    {
        for &seat in request.seats() {
            assert!(taken.insert(seat), "seat {seat} booked twice");
            assert_eq!(plan[seat], Seat::Confirmed(request.customer()));
        }
    }

    let confirmed = plan
        .iter()
        .filter(|s| matches!(s, Seat::Confirmed(_)))
        .count();
    assert_eq!(confirmed, taken.len());
    assert!(
        plan.iter().all(|s| !matches!(s, Seat::Held(_))),
        "no seats should be left held"
    );
}
