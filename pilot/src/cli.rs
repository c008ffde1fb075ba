use std::path::PathBuf;

use clap::Parser;

/// Air Lift pilot
#[derive(Debug, Clone, Parser)]
pub struct Args {
    /// State log shared by all actors
    pub log: PathBuf,

    /// Access key of the shared region (decimal, 0x hex or 0 octal)
    #[arg(value_parser = shared::parse_key)]
    pub key: u32,

    /// Write diagnostics to this file instead of stderr
    #[arg(long)]
    pub diagnostics: Option<PathBuf>,

    /// Seed for the flight times
    #[arg(long)]
    pub seed: Option<u64>,
}
