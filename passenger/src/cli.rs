use std::path::PathBuf;

use clap::Parser;

/// Air Lift passenger
#[derive(Debug, Clone, Parser)]
pub struct Args {
    /// Passenger id, below the run's passenger count
    pub id: u32,

    /// State log shared by all actors
    pub log: PathBuf,

    /// Access key of the shared region (decimal, 0x hex or 0 octal)
    #[arg(value_parser = shared::parse_key)]
    pub key: u32,

    /// Write diagnostics to this file instead of stderr
    #[arg(long)]
    pub diagnostics: Option<PathBuf>,

    /// Seed for the travel time
    #[arg(long)]
    pub seed: Option<u64>,
}
