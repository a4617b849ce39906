use anyhow::{bail, Context};
use cinema_booking::{CinemaConfig, Simulation};
use clap::Parser;
use tracing::{info, warn, Level};

#[derive(Parser)]
#[command(about = "Simulate customers booking cinema tickets over the phone")]
struct Args {
    #[arg(help = "Number of customers")]
    customers: u64,

    #[arg(
        allow_negative_numbers = true,
        help = "Seed for the random stream (its absolute value is used)"
    )]
    seed: i64,

    #[arg(
        short,
        long,
        default_value_t = 1.0,
        help = "Multiply every simulated delay by this factor"
    )]
    time_scale: f64,

    #[arg(short, long, help = "Log every pool acquire and release")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        })
        .init();

    let seed = args.seed.unsigned_abs();
    info!(customers = args.customers, seed, "Number of customers and seed");

    let config = CinemaConfig::default()
        .with_time_scale(args.time_scale)
        .context("invalid --time-scale")?;
    let simulation = Simulation::new(config, args.customers, seed)?;

    let report = tokio::select! {
        report = simulation.run() => report?,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, cancelling outstanding bookings");
            bail!("simulation interrupted");
        }
    };

    report.report().context("failed to write the report")?;
    Ok(())
}
