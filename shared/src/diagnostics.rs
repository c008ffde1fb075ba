use std::{
    fs::{File, OpenOptions},
    path::Path,
    process::ExitCode,
};

use anyhow::Context;
use env_logger::{Env, Target};
use log::{error, info};

use crate::{
    error::{exit_code, Fatal},
    AirLift,
};

/// Sets up `env_logger` (`RUST_LOG`, default `info`), writing to `path`
/// instead of stderr when given.
pub fn init(path: Option<&Path>) -> anyhow::Result<()> {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));

    if let Some(path) = path {
        builder.target(Target::Pipe(Box::new(open_diagnostics(path)?)));
    }

    builder.try_init()?;
    Ok(())
}

/// Each run starts its diagnostics file afresh.
fn open_diagnostics(path: &Path) -> anyhow::Result<File> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .with_context(|| format!("Opening diagnostics file {} failed", path.display()))
}

/// Process skeleton shared by the actors: attach to the region for `key`,
/// run `body`, detach. Each failure category gets its own exit status.
pub fn run_attached<E: Fatal>(
    role: &str,
    key: u32,
    body: impl FnOnce(&AirLift) -> Result<(), E>,
) -> ExitCode {
    let mem = match AirLift::join(key) {
        Ok(mem) => mem,
        Err(e) => {
            error!("{role}: attaching to the shared region failed: {e:#}");
            return ExitCode::from(exit_code::ATTACH);
        }
    };

    info!("{role} attached to key {key:#x}");

    if let Err(e) = body(mem.get()) {
        let code = e.exit_code();
        error!("{role}: {:#}", anyhow::Error::new(e));
        return ExitCode::from(code);
    }

    if let Err(e) = mem.detach() {
        error!("{role}: {e:#}");
        return ExitCode::from(exit_code::DETACH);
    }

    info!("{role} done");
    ExitCode::SUCCESS
}

#[cfg(test)]
mod test {
    use std::io;

    use super::*;
    use crate::{Params, SemOp, Signal, SyncError};

    #[derive(Debug, thiserror::Error)]
    #[error("boarding broke down")]
    struct Stuck(#[source] SyncError);

    impl Fatal for Stuck {}

    #[derive(Debug, thiserror::Error)]
    #[error("not part of this run")]
    struct Stranger;

    impl Fatal for Stranger {
        fn exit_code(&self) -> u8 {
            exit_code::ARGS
        }
    }

    fn key(salt: u32) -> u32 {
        std::process::id() ^ salt
    }

    #[test]
    fn missing_region_exits_with_attach_code() {
        let mut ran = false;
        let code = run_attached("pilot", key(0x3a77_0000), |_| {
            ran = true;
            Ok::<_, Stuck>(())
        });
        assert_eq!(code, ExitCode::from(exit_code::ATTACH));
        assert!(!ran);
    }

    #[test]
    fn body_failure_exits_with_its_own_code() {
        let key = key(0x3a77_1000);
        let _region = AirLift::create(key, Params::default()).unwrap();

        let code = run_attached("hostess", key, |_| {
            Err(Stuck(SyncError {
                op: SemOp::Acquire,
                sem: Signal::IdShown.name(),
                source: io::Error::from_raw_os_error(22),
            }))
        });
        assert_eq!(code, ExitCode::from(exit_code::SYNC));

        let code = run_attached("passenger 9", key, |_| Err(Stranger));
        assert_eq!(code, ExitCode::from(exit_code::ARGS));
    }

    #[test]
    fn attached_body_sees_the_region() {
        let key = key(0x3a77_2000);
        let region = AirLift::create(key, Params::default()).unwrap();
        region.get().with_state(|st| st.flight_number = 4).unwrap();

        let code = run_attached("pilot", key, |air| {
            assert_eq!(air.snapshot().unwrap().flight_number, 4);
            air.with_state(|st| st.flight_number += 1).map_err(Stuck)
        });
        assert_eq!(code, ExitCode::SUCCESS);
        assert_eq!(region.get().snapshot().unwrap().flight_number, 5);
    }

    #[test]
    fn diagnostics_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("error_pilot");
        std::fs::write(&path, "previous run\n").unwrap();

        open_diagnostics(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
