//! Errors.
//!
//! Running out of seats or having a payment declined are not errors. Those are terminal
//! [`BookingState`](crate::BookingState)s recorded in the metrics.

use thiserror::Error;

/// The run was set up with values that can't work.
///
/// Fatal to the run.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ConfigError {
    /// A random draw was asked for with an empty range.
    #[error("Random bound must be positive, got {0}")]
    InvalidBound(usize),

    /// A simulation needs at least one customer.
    #[error("Number of customers must be positive")]
    NoCustomers,

    /// The seat layout can't hold a request.
    #[error("Invalid cinema layout: {0}")]
    Layout(&'static str),

    /// A probability outside `[0, 1]`.
    #[error("Probability `{name}` must be within [0, 1], got {value}")]
    Probability {
        /// Which setting.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// Operators and cashiers need at least one unit each.
    #[error("The {0} pool must have at least one unit")]
    EmptyPool(&'static str),

    /// A delay range whose minimum exceeds its maximum.
    #[error("Delay range `{0}` has min greater than max")]
    InvertedDelay(&'static str),

    /// Delays can only be scaled by a positive, finite factor.
    #[error("Time scale must be positive and finite, got {0}")]
    TimeScale(f64),
}

/// Something went wrong while running a simulation.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SimulationError {
    /// The simulation could not be set up.
    #[error("Invalid configuration")]
    Config(#[from] ConfigError),

    /// A customer task was cancelled before reaching a terminal state.
    #[error("A customer task was cancelled")]
    Cancelled,

    /// A customer task panicked.
    #[error("A customer task panicked")]
    Panic,
}

impl From<tokio::task::JoinError> for SimulationError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            SimulationError::Cancelled
        } else {
            SimulationError::Panic
        }
    }
}
