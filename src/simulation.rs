//! Drives a whole run: one task per customer, arriving at random intervals.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{error, info};

use crate::{
    booking::BookingEngine,
    config::CinemaConfig,
    error::{ConfigError, SimulationError},
    report::SimulationReport,
    request::CustomerId,
};

/// A single run of the cinema with a fixed number of customers.
#[derive(Debug)]
pub struct Simulation {
    engine: Arc<BookingEngine>,
    customers: u64,
}

impl Simulation {
    /// Set up a run. The same seed and configuration give the same random stream.
    pub fn new(config: CinemaConfig, customers: u64, seed: u64) -> Result<Self, ConfigError> {
        if customers == 0 {
            return Err(ConfigError::NoCustomers);
        }
        let engine = BookingEngine::new(config, seed)?;

        Ok(Self {
            engine: Arc::new(engine),
            customers,
        })
    }

    /// The engine every customer books through.
    pub fn engine(&self) -> &Arc<BookingEngine> {
        &self.engine
    }

    /// Let every customer arrive and book, then collect the results.
    ///
    /// Customer 1 arrives straight away; each one after waits for a random arrival gap first.
    /// Dropping the returned future cancels every booking still in progress.
    pub async fn run(self) -> Result<SimulationReport, SimulationError> {
        info!(customers = self.customers, "Starting simulation");
        info!("Cinema: {}", self.engine.config());

        let mut bookings = JoinSet::new();

        for id in 1..=self.customers {
            if id > 1 {
                let gap = self
                    .engine
                    .random()
                    .delay(&self.engine.config().arrival_delay);
                tokio::time::sleep(gap).await;
            }

            let engine = Arc::clone(&self.engine);
            bookings.spawn(async move { engine.book(CustomerId(id)).await });
        }

        let mut requests = Vec::with_capacity(self.customers as usize);
        while let Some(result) = bookings.join_next().await {
            match result {
                Ok(request) => requests.push(request),
                Err(err) => {
                    error!("Customer task did not finish: {err}");
                    return Err(err.into());
                }
            }
        }
        requests.sort_by_key(|request| request.customer());

        Ok(SimulationReport {
            config: self.engine.config().clone(),
            requests,
            seats: self.engine.seat_plan(),
            metrics: self.engine.metrics().snapshot(),
            transactions: self.engine.transactions(),
        })
    }
}
