use std::process::{self, ExitCode};

use clap::Parser;
use rand::{rngs::StdRng, SeedableRng};

mod cli;

use cli::Args;
use passenger::Passenger;
use shared::{diagnostics, exit_code, StateLogger};

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = diagnostics::init(args.diagnostics.as_deref()) {
        eprintln!("{e:#}");
        return ExitCode::from(exit_code::DIAGNOSTICS);
    }

    let seed = args.seed.unwrap_or_else(|| u64::from(process::id()));
    let rng = StdRng::seed_from_u64(seed);

    diagnostics::run_attached(&format!("passenger {}", args.id), args.key, |air| {
        Passenger::new(args.id, air, StateLogger::new(&args.log), rng)?.run()
    })
}
