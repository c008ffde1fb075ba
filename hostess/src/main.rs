use std::process::ExitCode;

use clap::Parser;
use log::info;

mod cli;

use cli::Args;
use hostess::{Hostess, HostessError};
use shared::{diagnostics, exit_code, StateLogger};

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = diagnostics::init(args.diagnostics.as_deref()) {
        eprintln!("{e:#}");
        return ExitCode::from(exit_code::DIAGNOSTICS);
    }

    diagnostics::run_attached("hostess", args.key, |air| {
        let flights = Hostess::new(air, StateLogger::new(&args.log)).run()?;
        info!("hostess boarded {flights} flights");
        Ok::<_, HostessError>(())
    })
}
