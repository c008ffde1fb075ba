//! A passenger: travels to the airport, queues, boards when the hostess
//! calls and leaves the plane at the destination. The passenger emptying the
//! plane tells the pilot.

use std::thread;

use log::debug;
use rand::rngs::StdRng;

use shared::{exit_code, AirLift, Fatal, PassengerStatus, Signal, StateLogger, SyncError};

#[derive(Debug, thiserror::Error)]
pub enum PassengerError {
    #[error("passenger {id} is not part of this run ({passengers} passengers)")]
    UnknownPassenger { id: u32, passengers: u32 },
    #[error("passenger failed while waiting in the queue")]
    WaitInQueue(#[source] SyncError),
    #[error("passenger failed while waiting for the destination")]
    WaitUntilDestination(#[source] SyncError),
}

impl Fatal for PassengerError {
    fn exit_code(&self) -> u8 {
        match self {
            PassengerError::UnknownPassenger { .. } => exit_code::ARGS,
            _ => exit_code::SYNC,
        }
    }
}

pub struct Passenger<'a> {
    id: u32,
    air: &'a AirLift,
    logger: StateLogger,
    rng: StdRng,
}

impl<'a> Passenger<'a> {
    /// Rejects ids outside the run before any semaphore is touched.
    pub fn new(
        id: u32,
        air: &'a AirLift,
        logger: StateLogger,
        rng: StdRng,
    ) -> Result<Self, PassengerError> {
        let passengers = air.params().passengers;
        if id >= passengers {
            return Err(PassengerError::UnknownPassenger { id, passengers });
        }
        Ok(Self {
            id,
            air,
            logger,
            rng,
        })
    }

    pub fn run(&mut self) -> Result<(), PassengerError> {
        self.travel_to_airport();
        self.wait_in_queue()?;
        self.wait_until_destination()
    }

    pub fn travel_to_airport(&mut self) {
        let duration = self.air.params().travel_time(&mut self.rng);
        debug!("passenger {} travels for {duration:?}", self.id);
        thread::sleep(duration);
    }

    /// Joins the queue, waits to be called and shows the id to the hostess.
    pub fn wait_in_queue(&mut self) -> Result<(), PassengerError> {
        let id = self.id;
        self.air
            .with_state(|st| {
                st.passengers[id as usize] = PassengerStatus::InQueue;
                st.in_queue += 1;
                self.logger.save_state(st);
            })
            .map_err(PassengerError::WaitInQueue)?;

        self.air
            .release(Signal::PassengersInQueue)
            .map_err(PassengerError::WaitInQueue)?;
        self.air
            .acquire(Signal::PassengersWaitInQueue)
            .map_err(PassengerError::WaitInQueue)?;

        self.air
            .with_state(|st| {
                st.checked = Some(id);
                st.passengers[id as usize] = PassengerStatus::InFlight;
                self.logger.save_state(st);
            })
            .map_err(PassengerError::WaitInQueue)?;

        self.air
            .release(Signal::IdShown)
            .map_err(PassengerError::WaitInQueue)
    }

    /// Waits for the pilot to open the doors, leaves, then hands the doors
    /// to the next passenger or tells the pilot the plane is empty.
    pub fn wait_until_destination(&mut self) -> Result<(), PassengerError> {
        let id = self.id;
        self.air
            .acquire(Signal::PassengersWaitInFlight)
            .map_err(PassengerError::WaitUntilDestination)?;

        let last = self
            .air
            .with_state(|st| {
                st.passengers[id as usize] = PassengerStatus::AtDestination;
                debug_assert!(st.in_flight > 0, "left a plane with nobody aboard");
                st.in_flight -= 1;
                self.logger.save_state(st);
                st.in_flight == 0
            })
            .map_err(PassengerError::WaitUntilDestination)?;

        let next = if last {
            debug!("passenger {id} was the last to leave");
            Signal::PlaneEmpty
        } else {
            Signal::PassengersWaitInFlight
        };
        self.air
            .release(next)
            .map_err(PassengerError::WaitUntilDestination)
    }
}

#[cfg(test)]
mod test {
    use std::{path::Path, thread, time::Duration};

    use rand::SeedableRng;
    use shared::{read_log, Params};

    use super::*;

    fn params(passengers: u32) -> Params {
        Params {
            passengers,
            min_capacity: 1,
            max_capacity: passengers,
            max_flight_us: 0,
            max_travel_us: 0,
        }
    }

    fn passenger<'a>(air: &'a AirLift, log: &Path, id: u32) -> Passenger<'a> {
        Passenger::new(id, air, StateLogger::new(log), StdRng::seed_from_u64(id.into())).unwrap()
    }

    #[test]
    fn unknown_id_is_rejected() {
        let mem = AirLift::anonymous(params(2)).unwrap();
        let res = Passenger::new(
            2,
            mem.get(),
            StateLogger::new("unused.log"),
            StdRng::seed_from_u64(0),
        );
        assert!(matches!(
            res,
            Err(PassengerError::UnknownPassenger {
                id: 2,
                passengers: 2
            })
        ));
    }

    #[test]
    fn unknown_id_exits_like_bad_arguments() {
        let unknown = PassengerError::UnknownPassenger {
            id: 5,
            passengers: 3,
        };
        assert_eq!(unknown.exit_code(), exit_code::ARGS);
        assert_eq!(
            unknown.to_string(),
            "passenger 5 is not part of this run (3 passengers)"
        );
    }

    #[test]
    fn protocol_failures_exit_as_sync_errors() {
        let err = PassengerError::WaitInQueue(SyncError {
            op: shared::SemOp::Acquire,
            sem: Signal::PassengersWaitInQueue.name(),
            source: std::io::Error::from_raw_os_error(22),
        });
        assert_eq!(err.exit_code(), exit_code::SYNC);

        let chain = format!("{:#}", anyhow::Error::new(err));
        assert!(
            chain.contains("acquire on semaphore `passengersWaitInQueue` failed"),
            "{chain}"
        );
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "nobody aboard")]
    fn leaving_an_empty_plane_is_caught() {
        let mem = AirLift::anonymous(params(1)).unwrap();
        let air = mem.get();
        let mut p = passenger(air, Path::new("unused.log"), 0);

        air.release(Signal::PassengersWaitInFlight).unwrap();
        let _ = p.wait_until_destination();
    }

    #[test]
    fn waits_in_queue_until_called() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("airlift.log");
        let mem = AirLift::anonymous(params(1)).unwrap();
        let air = mem.get();
        StateLogger::create(&log, &air.snapshot().unwrap()).unwrap();
        let mut p = passenger(air, &log, 0);

        thread::scope(|s| {
            let queued = s.spawn(move || p.wait_in_queue());

            air.acquire(Signal::PassengersInQueue).unwrap();
            thread::sleep(Duration::from_millis(100));
            assert!(!queued.is_finished());
            let st = air.snapshot().unwrap();
            assert_eq!(st.passengers[0], PassengerStatus::InQueue);
            assert_eq!(st.in_queue, 1);
            assert_eq!(st.checked, None);

            air.release(Signal::PassengersWaitInQueue).unwrap();
            air.acquire(Signal::IdShown).unwrap();
            queued.join().unwrap().unwrap();
        });

        let st = air.snapshot().unwrap();
        assert_eq!(st.checked, Some(0));
        assert_eq!(st.passengers[0], PassengerStatus::InFlight);
        assert_eq!(read_log(&log).unwrap().len(), 3);
    }

    #[test]
    fn only_the_last_passenger_signals_plane_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("airlift.log");
        let mem = AirLift::anonymous(params(3)).unwrap();
        let air = mem.get();
        StateLogger::create(&log, &air.snapshot().unwrap()).unwrap();
        air.with_state(|st| {
            st.in_flight = 3;
            st.boarded = 3;
        })
        .unwrap();

        thread::scope(|s| {
            for id in 0..3 {
                let mut p = passenger(air, &log, id);
                s.spawn(move || p.wait_until_destination().unwrap());
            }

            thread::sleep(Duration::from_millis(50));
            assert_eq!(air.snapshot().unwrap().in_flight, 3);

            air.release(Signal::PassengersWaitInFlight).unwrap();
            air.acquire(Signal::PlaneEmpty).unwrap();

            let st = air.snapshot().unwrap();
            assert_eq!(st.in_flight, 0);
            assert!(st
                .active_passengers()
                .iter()
                .all(|p| *p == PassengerStatus::AtDestination));
        });

        assert_eq!(air.permits(Signal::PassengersWaitInFlight).unwrap(), 0);
        assert_eq!(air.permits(Signal::PlaneEmpty).unwrap(), 0);
    }
}
