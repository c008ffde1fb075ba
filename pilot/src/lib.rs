//! The pilot: flies the plane back and forth until the hostess declares the
//! air lift finished.

use std::thread;

use log::debug;
use rand::rngs::StdRng;

use shared::{AirLift, Fatal, PilotStatus, Signal, StateLogger, SyncError};

/// One variant per step of the cycle, so a failure tells where the cycle
/// broke.
#[derive(Debug, thiserror::Error)]
pub enum PilotError {
    #[error("pilot could not check whether the air lift finished")]
    CheckFinished(#[source] SyncError),
    #[error("pilot failed to start the flight")]
    Flight(#[source] SyncError),
    #[error("pilot failed to signal ready for boarding")]
    SignalReadyForBoarding(#[source] SyncError),
    #[error("pilot failed while waiting for boarding to complete")]
    WaitUntilReadyToFlight(#[source] SyncError),
    #[error("pilot failed while dropping passengers at target")]
    DropPassengersAtTarget(#[source] SyncError),
}

impl Fatal for PilotError {}

pub struct Pilot<'a> {
    air: &'a AirLift,
    logger: StateLogger,
    rng: StdRng,
}

impl<'a> Pilot<'a> {
    pub fn new(air: &'a AirLift, logger: StateLogger, rng: StdRng) -> Self {
        Self { air, logger, rng }
    }

    /// Runs whole cycles until `finished` is seen at the top of a cycle.
    /// Returns the number of completed cycles.
    pub fn run(&mut self) -> Result<u32, PilotError> {
        let mut cycles = 0;
        while !self.is_finished()? {
            self.flight(false)?;
            self.signal_ready_for_boarding()?;
            self.wait_until_ready_to_flight()?;
            self.flight(true)?;
            self.drop_passengers_at_target()?;
            cycles += 1;
        }
        Ok(cycles)
    }

    pub fn is_finished(&self) -> Result<bool, PilotError> {
        self.air
            .with_state(|st| st.finished)
            .map_err(PilotError::CheckFinished)
    }

    /// Flies to the destination (`go`) or back to the origin, sleeping the
    /// flight time with nothing held.
    pub fn flight(&mut self, go: bool) -> Result<(), PilotError> {
        let status = if go {
            PilotStatus::Flying
        } else {
            PilotStatus::FlyingBack
        };
        self.air
            .with_state(|st| {
                st.pilot = status;
                self.logger.save_state(st);
            })
            .map_err(PilotError::Flight)?;

        let duration = self.air.params().flight_time(&mut self.rng);
        debug!("{status:?} for {duration:?}");
        thread::sleep(duration);
        Ok(())
    }

    /// Opens boarding for the next flight and wakes the hostess.
    pub fn signal_ready_for_boarding(&mut self) -> Result<(), PilotError> {
        let flight = self
            .air
            .with_state(|st| {
                st.pilot = PilotStatus::ReadyForBoarding;
                st.flight_number += 1;
                self.logger.save_state(st);
                self.logger.save_boarding_started(st);
                st.flight_number
            })
            .map_err(PilotError::SignalReadyForBoarding)?;

        debug!("boarding started for flight {flight}");
        self.air
            .release(Signal::ReadyForBoarding)
            .map_err(PilotError::SignalReadyForBoarding)
    }

    /// Blocks until the hostess closes boarding. There is no timeout.
    pub fn wait_until_ready_to_flight(&mut self) -> Result<(), PilotError> {
        self.air
            .with_state(|st| {
                st.pilot = PilotStatus::WaitingForBoarding;
                self.logger.save_state(st);
            })
            .map_err(PilotError::WaitUntilReadyToFlight)?;

        self.air
            .acquire(Signal::ReadyToFlight)
            .map_err(PilotError::WaitUntilReadyToFlight)
    }

    /// Lets the passengers out and waits for the last one to leave.
    pub fn drop_passengers_at_target(&mut self) -> Result<(), PilotError> {
        self.air
            .with_state(|st| {
                st.pilot = PilotStatus::DroppingPassengers;
                self.logger.save_flight_arrived(st);
                self.logger.save_state(st);
            })
            .map_err(PilotError::DropPassengersAtTarget)?;

        self.air
            .release(Signal::PassengersWaitInFlight)
            .map_err(PilotError::DropPassengersAtTarget)?;
        self.air
            .acquire(Signal::PlaneEmpty)
            .map_err(PilotError::DropPassengersAtTarget)?;

        self.air
            .with_state(|st| self.logger.save_flight_returning(st))
            .map_err(PilotError::DropPassengersAtTarget)
    }
}
