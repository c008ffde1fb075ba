use std::path::PathBuf;

use clap::Parser;
use shared::Params;

/// Air Lift simulator: creates the shared region, launches every actor as
/// its own process and waits for the air lift to finish
#[derive(Debug, Clone, Parser)]
pub struct Args {
    /// Access key of the shared region (decimal, 0x hex or 0 octal); random when omitted
    #[arg(long, value_parser = shared::parse_key)]
    pub key: Option<u32>,

    /// State log written by all actors
    #[arg(long, default_value = "airlift.log")]
    pub log: PathBuf,

    /// Number of passengers
    #[arg(short, long, default_value_t = 21)]
    pub passengers: u32,

    /// Minimum passengers per flight while others are still on their way
    #[arg(long, default_value_t = 5)]
    pub min_capacity: u32,

    /// Plane capacity
    #[arg(long, default_value_t = 10)]
    pub max_capacity: u32,

    /// Upper bound of a flight, in microseconds
    #[arg(long, default_value_t = 1_000)]
    pub max_flight_us: u64,

    /// Upper bound of a passenger's trip to the airport, in microseconds
    #[arg(long, default_value_t = 100_000)]
    pub max_travel_us: u64,

    /// Directory holding the pilot, hostess and passenger binaries
    ///
    /// Defaults to the directory of this executable
    #[arg(long)]
    pub bin_dir: Option<PathBuf>,

    /// Redirect each actor's diagnostics to error_<role> in this directory
    #[arg(long)]
    pub diagnostics_dir: Option<PathBuf>,

    /// Base seed for the actors' random delays
    #[arg(long)]
    pub seed: Option<u64>,
}

impl Args {
    pub fn params(&self) -> Params {
        Params {
            passengers: self.passengers,
            min_capacity: self.min_capacity,
            max_capacity: self.max_capacity,
            max_flight_us: self.max_flight_us,
            max_travel_us: self.max_travel_us,
        }
    }
}
