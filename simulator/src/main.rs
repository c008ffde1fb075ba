use std::{
    fs,
    process::{exit, ExitCode},
};

use anyhow::Context;
use clap::Parser;
use log::{error, info};
use rustix::shm;

pub mod cli;
pub mod launcher;

use cli::Args;
use launcher::{supervise, Launcher};
use shared::{diagnostics, exit_code, shm_name, AirLift, StateLogger};

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = diagnostics::init(None) {
        eprintln!("{e:#}");
        return ExitCode::from(exit_code::DIAGNOSTICS);
    }

    let params = args.params();
    if let Err(e) = params.validate() {
        error!("{e}");
        return ExitCode::from(exit_code::ARGS);
    }

    let key = args.key.unwrap_or_else(rand::random);

    let mem = match AirLift::create(key, params) {
        Ok(mem) => mem,
        Err(e) => {
            error!("{e:#}");
            return ExitCode::from(exit_code::ATTACH);
        }
    };

    info!("Initialized {} for {params:?}", shm_name(key));

    match run(&args, mem.get(), key) {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args, air: &AirLift, key: u32) -> anyhow::Result<ExitCode> {
    let initial = air.snapshot()?;
    StateLogger::create(&args.log, &initial)?;

    ctrlc::set_handler(move || {
        let _ = shm::unlink(shm_name(key));
        exit(130);
    })?;

    if let Some(dir) = &args.diagnostics_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("Creating diagnostics directory {} failed", dir.display()))?;
    }

    let launcher = Launcher {
        bin_dir: match &args.bin_dir {
            Some(dir) => dir.clone(),
            None => Launcher::default_bin_dir()?,
        },
        log: args.log.clone(),
        key,
        diagnostics_dir: args.diagnostics_dir.clone(),
        seed: args.seed,
    };

    let children = launcher.spawn_all(air.params().passengers)?;
    let outcomes = supervise(children);

    if let Some(failed) = outcomes.iter().find(|o| !o.success()) {
        let code = match &failed.status {
            Ok(status) => status.code().and_then(|c| u8::try_from(c).ok()),
            Err(_) => None,
        };
        error!("air lift aborted, {} failed first", failed.role);
        return Ok(ExitCode::from(code.unwrap_or(exit_code::SYNC)));
    }

    let st = air.snapshot()?;
    info!(
        "air lift finished: {} passengers in {} flights, log at {}",
        st.boarded,
        st.flight_number,
        args.log.display()
    );
    Ok(ExitCode::SUCCESS)
}
