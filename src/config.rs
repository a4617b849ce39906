use std::{
    fmt::{self, Display},
    ops::Range,
    time::Duration,
};

use bon::bon;

use crate::error::ConfigError;

/// One of the two partitions of the seat map.
///
/// Zone B occupies the seat indices immediately after zone A.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Zone {
    /// The front zone.
    A,
    /// The back zone.
    B,
}

impl Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Zone::A => "Zone A",
            Zone::B => "Zone B",
        })
    }
}

/// An inclusive range of simulated delays, sampled at millisecond granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    pub(crate) min: Duration,
    pub(crate) max: Duration,
}

impl DelayRange {
    /// No delay at all.
    pub const ZERO: DelayRange = DelayRange::fixed(Duration::ZERO);

    /// Anywhere from `min` to `max`, inclusive.
    pub const fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    /// Always the same delay.
    pub const fn fixed(delay: Duration) -> Self {
        Self::new(delay, delay)
    }

    /// Like [`new`](Self::new), in whole seconds.
    pub const fn from_secs(min: u64, max: u64) -> Self {
        Self::new(Duration::from_secs(min), Duration::from_secs(max))
    }

    /// The shortest delay.
    pub fn min(&self) -> Duration {
        self.min
    }

    /// The longest delay.
    pub fn max(&self) -> Duration {
        self.max
    }

    /// Both ends multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.min.mul_f64(factor), self.max.mul_f64(factor))
    }

    pub(crate) fn millis(&self) -> (u64, u64) {
        (self.min.as_millis() as u64, self.max.as_millis() as u64)
    }
}

impl Display for DelayRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.1}s..={:.1}s",
            self.min.as_secs_f64(),
            self.max.as_secs_f64()
        )
    }
}

/// Process-wide constants for a run: the seat layout, prices, pool sizes and the
/// probabilities and delays driving each customer.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct CinemaConfig {
    pub(crate) row_width: usize,
    pub(crate) zone_a_rows: usize,
    pub(crate) zone_b_rows: usize,
    pub(crate) zone_a_price: u64,
    pub(crate) zone_b_price: u64,
    pub(crate) zone_a_probability: f64,
    pub(crate) operators: usize,
    pub(crate) cashiers: usize,
    pub(crate) min_seats: usize,
    pub(crate) max_seats: usize,
    pub(crate) search_delay: DelayRange,
    pub(crate) payment_delay: DelayRange,
    pub(crate) arrival_delay: DelayRange,
    pub(crate) payment_success_probability: f64,
}

#[bon]
impl CinemaConfig {
    #[allow(missing_docs)]
    #[builder]
    pub fn new(
        /// Seats in every row.
        #[builder(default = 10)]
        row_width: usize,
        /// Rows in zone A.
        #[builder(default = 10)]
        zone_a_rows: usize,
        /// Rows in zone B.
        #[builder(default = 20)]
        zone_b_rows: usize,
        /// Price of one seat in zone A.
        #[builder(default = 30)]
        zone_a_price: u64,
        /// Price of one seat in zone B.
        #[builder(default = 20)]
        zone_b_price: u64,
        /// Chance that a customer asks for zone A. Zone B gets the rest.
        #[builder(default = 0.3)]
        zone_a_probability: f64,
        /// Size of the operator pool.
        #[builder(default = 3)]
        operators: usize,
        /// Size of the cashier pool.
        #[builder(default = 2)]
        cashiers: usize,
        /// Fewest seats a customer asks for.
        #[builder(default = 1)]
        min_seats: usize,
        /// Most seats a customer asks for.
        #[builder(default = 5)]
        max_seats: usize,
        /// How long an operator spends looking for seats.
        #[builder(default = DelayRange::from_secs(5, 13))]
        search_delay: DelayRange,
        /// How long a cashier spends processing a payment.
        #[builder(default = DelayRange::from_secs(4, 8))]
        payment_delay: DelayRange,
        /// Gap between consecutive customer arrivals.
        #[builder(default = DelayRange::from_secs(1, 5))]
        arrival_delay: DelayRange,
        /// Chance that a payment goes through, regardless of the amount.
        #[builder(default = 0.9)]
        payment_success_probability: f64,
    ) -> Self {
        Self {
            row_width,
            zone_a_rows,
            zone_b_rows,
            zone_a_price,
            zone_b_price,
            zone_a_probability,
            operators,
            cashiers,
            min_seats,
            max_seats,
            search_delay,
            payment_delay,
            arrival_delay,
            payment_success_probability,
        }
    }
}

impl Default for CinemaConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl CinemaConfig {
    /// Check that the configuration describes a run that can actually happen.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.row_width == 0 {
            return Err(ConfigError::Layout("rows must have at least one seat"));
        }
        if self.zone_a_rows + self.zone_b_rows == 0 {
            return Err(ConfigError::Layout("the cinema must have at least one row"));
        }
        if self.min_seats == 0 {
            return Err(ConfigError::Layout("customers must ask for at least one seat"));
        }
        if self.min_seats > self.max_seats {
            return Err(ConfigError::Layout("min seats is greater than max seats"));
        }
        if self.max_seats > self.row_width {
            return Err(ConfigError::Layout("max seats doesn't fit in a single row"));
        }

        for (name, value) in [
            ("zone_a_probability", self.zone_a_probability),
            ("payment_success_probability", self.payment_success_probability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Probability { name, value });
            }
        }

        if self.operators == 0 {
            return Err(ConfigError::EmptyPool("operator"));
        }
        if self.cashiers == 0 {
            return Err(ConfigError::EmptyPool("cashier"));
        }

        for (name, range) in [
            ("search_delay", self.search_delay),
            ("payment_delay", self.payment_delay),
            ("arrival_delay", self.arrival_delay),
        ] {
            if range.min > range.max {
                return Err(ConfigError::InvertedDelay(name));
            }
        }

        Ok(())
    }

    /// The same configuration with every delay multiplied by `factor`.
    pub fn with_time_scale(mut self, factor: f64) -> Result<Self, ConfigError> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(ConfigError::TimeScale(factor));
        }
        self.search_delay = self.search_delay.scaled(factor);
        self.payment_delay = self.payment_delay.scaled(factor);
        self.arrival_delay = self.arrival_delay.scaled(factor);
        Ok(self)
    }

    /// Seats in every row.
    pub fn row_width(&self) -> usize {
        self.row_width
    }

    /// Get the number of operators.
    pub fn operators(&self) -> usize {
        self.operators
    }

    /// Get the number of cashiers.
    pub fn cashiers(&self) -> usize {
        self.cashiers
    }

    /// Seats across both zones.
    pub fn total_seats(&self) -> usize {
        (self.zone_a_rows + self.zone_b_rows) * self.row_width
    }

    /// Seat indices belonging to `zone`.
    pub fn zone_range(&self, zone: Zone) -> Range<usize> {
        let boundary = self.zone_a_rows * self.row_width;
        match zone {
            Zone::A => 0..boundary,
            Zone::B => boundary..self.total_seats(),
        }
    }

    /// Which zone a seat index is in.
    pub fn zone_of(&self, index: usize) -> Zone {
        if index < self.zone_a_rows * self.row_width {
            Zone::A
        } else {
            Zone::B
        }
    }

    /// The 1-based row of a seat, counted from the start of its zone.
    pub fn row_of(&self, index: usize) -> usize {
        let row = index / self.row_width + 1;
        match self.zone_of(index) {
            Zone::A => row,
            Zone::B => row - self.zone_a_rows,
        }
    }

    /// Price of a single seat in `zone`.
    pub fn price(&self, zone: Zone) -> u64 {
        match zone {
            Zone::A => self.zone_a_price,
            Zone::B => self.zone_b_price,
        }
    }
}

impl Display for CinemaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "seats: {} ({}x{} in A at {}, {}x{} in B at {}), operators: {}, cashiers: {}, \
             seats per request: {}..={}, search: {}, payment: {}, arrivals: {}",
            self.total_seats(),
            self.zone_a_rows,
            self.row_width,
            self.zone_a_price,
            self.zone_b_rows,
            self.row_width,
            self.zone_b_price,
            self.operators,
            self.cashiers,
            self.min_seats,
            self.max_seats,
            self.search_delay,
            self.payment_delay,
            self.arrival_delay,
        )
    }
}
