//! Printing the outcome of a run.

use std::{
    fmt::{self, Display},
    io::{self, Write},
};

use crate::{
    config::{CinemaConfig, Zone},
    metrics::MetricsSnapshot,
    request::CustomerRequest,
    seats::Seat,
};

/// Everything observable once every customer has finished.
#[derive(Debug, Clone)]
pub struct SimulationReport {
    /// The configuration the run used.
    pub config: CinemaConfig,
    /// One per customer, ordered by customer.
    pub requests: Vec<CustomerRequest>,
    /// Final owner of each seat, in seat order.
    pub seats: Vec<Seat>,
    #[allow(missing_docs)]
    pub metrics: MetricsSnapshot,
    /// How many customers got through to an operator.
    pub transactions: u64,
}

impl SimulationReport {
    /// One line per seat.
    pub fn seat_plan(&self) -> impl Iterator<Item = SeatLine> + '_ {
        self.seats.iter().enumerate().map(|(index, seat)| SeatLine {
            zone: self.config.zone_of(index),
            row: self.config.row_of(index),
            number: index + 1,
            seat: *seat,
        })
    }

    /// Print the seat plan and the summary to stdout.
    pub fn report(&self) -> io::Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.write_seat_plan(&mut out)?;
        self.write_summary(&mut out)
    }

    /// Write one line per seat.
    pub fn write_seat_plan(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "\n=== Plan of Seats ===")?;
        for line in self.seat_plan() {
            writeln!(out, "{line}")?;
        }
        Ok(())
    }

    /// Write the outcome counts, revenue and mean times.
    pub fn write_summary(&self, out: &mut impl Write) -> io::Result<()> {
        let m = &self.metrics;

        writeln!(out, "\n=== Simulation Results ===")?;
        writeln!(out, "Total revenue:                      {}$", m.revenue)?;
        writeln!(out, "Total transactions:                 {}", self.transactions)?;
        writeln!(out, "Successful transactions:            {}", m.successful)?;
        writeln!(out, "Failed, unavailable seats:          {}", m.failed_no_seats)?;
        writeln!(out, "Failed, unsuccessful payment:       {}", m.failed_payment)?;
        writeln!(
            out,
            "Average waiting time:               {:.2} seconds",
            m.mean_wait().as_secs_f64()
        )?;
        writeln!(
            out,
            "Average transaction time:           {:.2} seconds",
            m.mean_service().as_secs_f64()
        )?;
        writeln!(
            out,
            "Successful:                         {}%",
            m.percentage(m.successful)
        )?;
        writeln!(
            out,
            "Failed, unavailable seats:          {}%",
            m.percentage(m.failed_no_seats)
        )?;
        writeln!(
            out,
            "Failed, unsuccessful payment:       {}%",
            m.percentage(m.failed_payment)
        )?;
        Ok(())
    }
}

/// A seat as shown in the plan, e.g. `Zone B / Row 3 / Seat 121 / Customer 7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeatLine {
    #[allow(missing_docs)]
    pub zone: Zone,
    /// 1-based, counted from the start of the zone.
    pub row: usize,
    /// 1-based, counted from the first seat of the cinema.
    pub number: usize,
    #[allow(missing_docs)]
    pub seat: Seat,
}

impl Display for SeatLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / Row {} / Seat {} / ", self.zone, self.row, self.number)?;
        match self.seat {
            Seat::Confirmed(customer) => write!(f, "{customer}"),
            Seat::Held(transaction) => write!(f, "Held by {transaction}"),
            Seat::Empty => f.write_str("Empty"),
        }
    }
}
