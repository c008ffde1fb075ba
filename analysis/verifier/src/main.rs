use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use shared::{read_log, trace};

/// Replays an air lift state log and reports protocol violations
#[derive(Debug, Parser)]
struct Args {
    /// State log written by a run
    log: PathBuf,

    /// Also check that no flight departed with more passengers than this
    #[arg(long)]
    max_capacity: Option<u32>,
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    let records = read_log(&args.log)?;
    let summary = trace::check(&records, args.max_capacity);

    println!("--- Summary ---");
    println!();
    println!("records: {}", summary.records);
    println!("flights: {}", summary.flights);
    for (flight, passengers) in summary.departures.iter().enumerate() {
        println!("  flight {:>3}: {passengers} passengers", flight + 1);
    }
    println!(
        "run {}",
        if summary.finished {
            "finished"
        } else {
            "did not finish"
        }
    );
    println!();

    if summary.is_valid() {
        println!("no violations");
        return Ok(ExitCode::SUCCESS);
    }

    println!("{} violations:", summary.violations.len());
    for violation in &summary.violations {
        println!("  {violation}");
    }
    Ok(ExitCode::FAILURE)
}
