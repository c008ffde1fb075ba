use std::{
    fmt,
    path::{Path, PathBuf},
    process::{Child, Command, ExitStatus},
    thread,
};

use anyhow::Context;
use crossbeam_channel::unbounded;
use log::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Pilot,
    Hostess,
    Passenger(u32),
}

impl Role {
    fn binary(self) -> &'static str {
        match self {
            Role::Pilot => "pilot",
            Role::Hostess => "hostess",
            Role::Passenger(_) => "passenger",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Passenger(id) => write!(f, "passenger_{id}"),
            role => f.write_str(role.binary()),
        }
    }
}

/// Builds the command line of every actor of one run.
#[derive(Debug, Clone)]
pub struct Launcher {
    pub bin_dir: PathBuf,
    pub log: PathBuf,
    pub key: u32,
    pub diagnostics_dir: Option<PathBuf>,
    pub seed: Option<u64>,
}

impl Launcher {
    /// Directory of the running executable, where cargo puts the sibling binaries.
    pub fn default_bin_dir() -> anyhow::Result<PathBuf> {
        let exe = std::env::current_exe().context("Locating the simulator executable failed")?;
        exe.parent()
            .map(Path::to_path_buf)
            .context("Simulator executable has no parent directory")
    }

    pub fn command(&self, role: Role) -> Command {
        let mut cmd = Command::new(self.bin_dir.join(role.binary()));

        if let Role::Passenger(id) = role {
            cmd.arg(id.to_string());
        }
        cmd.arg(&self.log).arg(format!("{:#x}", self.key));

        if let Some(dir) = &self.diagnostics_dir {
            cmd.arg("--diagnostics").arg(dir.join(format!("error_{role}")));
        }

        match (role, self.seed) {
            (Role::Pilot, Some(seed)) => {
                cmd.arg("--seed").arg(seed.to_string());
            }
            (Role::Passenger(id), Some(seed)) => {
                let seed = seed.wrapping_add(1 + u64::from(id));
                cmd.arg("--seed").arg(seed.to_string());
            }
            _ => {}
        }

        cmd
    }

    /// Starts the pilot, the hostess and `passengers` passengers. If any
    /// spawn fails the ones already running are killed.
    pub fn spawn_all(&self, passengers: u32) -> anyhow::Result<Vec<(Role, Child)>> {
        let roles = [Role::Pilot, Role::Hostess]
            .into_iter()
            .chain((0..passengers).map(Role::Passenger));

        let mut children = Vec::new();
        for role in roles {
            match self.command(role).spawn() {
                Ok(child) => {
                    debug!("launched {role} as pid {}", child.id());
                    children.push((role, child));
                }
                Err(e) => {
                    for (_, child) in &mut children {
                        let _ = child.kill();
                        let _ = child.wait();
                    }
                    return Err(e).with_context(|| format!("Launching {role} failed"));
                }
            }
        }

        info!("launched {} actors", children.len());
        Ok(children)
    }
}

/// How one actor ended.
#[derive(Debug)]
pub struct Outcome {
    pub role: Role,
    pub status: std::io::Result<ExitStatus>,
}

impl Outcome {
    pub fn success(&self) -> bool {
        matches!(&self.status, Ok(status) if status.success())
    }
}

/// Waits for every child on its own thread. The first unsuccessful exit
/// terminates the actors still running, as nobody can release what they
/// wait for any more.
pub fn supervise(children: Vec<(Role, Child)>) -> Vec<Outcome> {
    let (tx, rx) = unbounded();
    let mut running: Vec<(Role, u32)> = children
        .iter()
        .map(|(role, child)| (*role, child.id()))
        .collect();

    thread::scope(|s| {
        for (role, mut child) in children {
            let tx = tx.clone();
            s.spawn(move || {
                let status = child.wait();
                let _ = tx.send(Outcome { role, status });
            });
        }
        drop(tx);

        let mut outcomes = Vec::with_capacity(running.len());
        let mut aborted = false;

        for outcome in rx.iter() {
            running.retain(|(role, _)| *role != outcome.role);

            if outcome.success() {
                debug!("{} finished", outcome.role);
            } else {
                match &outcome.status {
                    Ok(status) => error!("{} failed: {status}", outcome.role),
                    Err(e) => error!("waiting for {} failed: {e}", outcome.role),
                }
                if !aborted {
                    aborted = true;
                    terminate(&running);
                }
            }

            outcomes.push(outcome);
        }

        outcomes
    })
}

fn terminate(running: &[(Role, u32)]) {
    for &(role, pid) in running {
        warn!("terminating {role} (pid {pid})");
        let Ok(pid) = libc::pid_t::try_from(pid) else {
            continue;
        };
        // Safety: kill(2) takes no pointers
        if unsafe { libc::kill(pid, libc::SIGTERM) } != 0 {
            warn!(
                "signalling {role} failed: {}",
                std::io::Error::last_os_error()
            );
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn launcher() -> Launcher {
        Launcher {
            bin_dir: PathBuf::from("/opt/airlift"),
            log: PathBuf::from("run.log"),
            key: 0x1f,
            diagnostics_dir: Some(PathBuf::from("/tmp/diag")),
            seed: Some(10),
        }
    }

    fn args(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn role_names() {
        assert_eq!(Role::Pilot.to_string(), "pilot");
        assert_eq!(Role::Hostess.to_string(), "hostess");
        assert_eq!(Role::Passenger(7).to_string(), "passenger_7");
    }

    #[test]
    fn passenger_command_line() {
        let cmd = launcher().command(Role::Passenger(3));
        assert_eq!(cmd.get_program(), "/opt/airlift/passenger");
        assert_eq!(
            args(&cmd),
            [
                "3",
                "run.log",
                "0x1f",
                "--diagnostics",
                "/tmp/diag/error_passenger_3",
                "--seed",
                "14"
            ]
        );
    }

    #[test]
    fn hostess_takes_no_seed() {
        let cmd = launcher().command(Role::Hostess);
        assert_eq!(cmd.get_program(), "/opt/airlift/hostess");
        assert_eq!(
            args(&cmd),
            [
                "run.log",
                "0x1f",
                "--diagnostics",
                "/tmp/diag/error_hostess"
            ]
        );
    }

    #[test]
    fn plain_pilot_command_line() {
        let launcher = Launcher {
            diagnostics_dir: None,
            seed: None,
            ..launcher()
        };
        assert_eq!(args(&launcher.command(Role::Pilot)), ["run.log", "0x1f"]);
    }

    #[test]
    fn failure_terminates_the_rest() {
        let sleeper = Command::new("sleep").arg("30").spawn().unwrap();
        let failing = Command::new("false").spawn().unwrap();

        let outcomes = supervise(vec![(Role::Pilot, sleeper), (Role::Hostess, failing)]);

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| !o.success()));
        assert_eq!(outcomes[0].role, Role::Hostess);
    }

    #[test]
    fn successful_run_collects_every_actor() {
        let children = (0..3)
            .map(|id| (Role::Passenger(id), Command::new("true").spawn().unwrap()))
            .collect();

        let outcomes = supervise(children);

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().all(Outcome::success));
    }
}
