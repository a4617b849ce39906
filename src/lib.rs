//! Concurrent ticket booking at a cinema.
//!
//! Many customers compete for a few booking operators, a shared block of numbered seats and a
//! few payment cashiers. Each customer:
//!
//! 1. waits for an operator,
//! 2. asks for a number of seats in one of two zones,
//! 3. gets the first contiguous run of free seats in a single row, if there is one,
//! 4. frees the operator, then waits for a cashier,
//! 5. pays, or has the payment declined and the seats released.
//!
//! The operator pool, the cashier pool and the seat map are separate critical sections, and no
//! lock is held across a wait on another. All random decisions come from one seeded stream.
//!
//! See the README for an example.

#![deny(missing_docs)]

#[cfg(doctest)]
use doc_comment::doctest;
#[cfg(doctest)]
doctest!("../README.md");

mod booking;
mod config;
pub mod error;
mod metrics;
mod pool;
mod random;
mod report;
mod request;
mod seats;
mod simulation;

pub use booking::BookingEngine;
pub use config::{CinemaConfig, DelayRange, Zone};
pub use error::{ConfigError, SimulationError};
pub use metrics::{Metrics, MetricsSnapshot};
pub use pool::{Permit, ResourcePool};
pub use random::SharedRandom;
pub use report::{SeatLine, SimulationReport};
pub use request::{BookingState, CustomerId, CustomerRequest, TransactionId};
pub use seats::{Seat, SeatHold, SeatMap};
pub use simulation::Simulation;
