//! The hostess: opens boarding when the pilot asks for it, checks queued
//! passengers one at a time and closes boarding according to the plane
//! capacity.

use log::debug;

use shared::{
    AirLift, Fatal, FullState, HostessStatus, Params, Signal, StateLogger, SyncError,
};

#[derive(Debug, thiserror::Error)]
pub enum HostessError {
    #[error("hostess could not check whether the air lift finished")]
    CheckFinished(#[source] SyncError),
    #[error("hostess failed while waiting for the next flight")]
    WaitForNextFlight(#[source] SyncError),
    #[error("hostess failed while waiting for a passenger")]
    WaitForPassenger(#[source] SyncError),
    #[error("hostess failed while checking a passport")]
    CheckPassport(#[source] SyncError),
    #[error("hostess failed to signal ready to fly")]
    SignalReadyToFlight(#[source] SyncError),
}

impl Fatal for HostessError {}

/// Whether boarding closes after the passenger just checked: the plane is
/// full, everybody has boarded, or nobody is waiting and the minimum is
/// reached.
pub fn boarding_closes(st: &FullState, params: &Params) -> bool {
    st.in_flight >= params.max_capacity
        || st.boarded >= st.n_passengers
        || (st.in_queue == 0 && st.in_flight >= params.min_capacity)
}

pub struct Hostess<'a> {
    air: &'a AirLift,
    logger: StateLogger,
}

impl<'a> Hostess<'a> {
    pub fn new(air: &'a AirLift, logger: StateLogger) -> Self {
        Self { air, logger }
    }

    /// Boards flights until every passenger has boarded. Returns the number
    /// of flights boarded.
    pub fn run(&mut self) -> Result<u32, HostessError> {
        let mut flights = 0;
        while !self.is_finished()? {
            self.wait_for_next_flight()?;
            loop {
                self.wait_for_passenger()?;
                if self.check_passport()? {
                    break;
                }
            }
            self.signal_ready_to_flight()?;
            flights += 1;
        }
        Ok(flights)
    }

    pub fn is_finished(&self) -> Result<bool, HostessError> {
        self.air
            .with_state(|st| st.finished)
            .map_err(HostessError::CheckFinished)
    }

    pub fn wait_for_next_flight(&mut self) -> Result<(), HostessError> {
        self.air
            .with_state(|st| {
                st.hostess = HostessStatus::WaitForNextFlight;
                self.logger.save_state(st);
            })
            .map_err(HostessError::WaitForNextFlight)?;

        self.air
            .acquire(Signal::ReadyForBoarding)
            .map_err(HostessError::WaitForNextFlight)
    }

    pub fn wait_for_passenger(&mut self) -> Result<(), HostessError> {
        self.air
            .with_state(|st| {
                st.hostess = HostessStatus::WaitForPassenger;
                self.logger.save_state(st);
            })
            .map_err(HostessError::WaitForPassenger)?;

        self.air
            .acquire(Signal::PassengersInQueue)
            .map_err(HostessError::WaitForPassenger)
    }

    /// Calls one queued passenger and boards it. Returns whether boarding
    /// closes with this passenger.
    pub fn check_passport(&mut self) -> Result<bool, HostessError> {
        self.air
            .release(Signal::PassengersWaitInQueue)
            .map_err(HostessError::CheckPassport)?;
        self.air
            .acquire(Signal::IdShown)
            .map_err(HostessError::CheckPassport)?;

        let params = self.air.params();
        let (checked, closes) = self
            .air
            .with_state(|st| {
                debug_assert!(st.in_queue > 0, "checked a passenger with an empty queue");
                st.in_queue -= 1;
                st.in_flight += 1;
                st.boarded += 1;
                st.hostess = HostessStatus::CheckPassenger;
                self.logger.save_passenger_checked(st);
                (st.checked, boarding_closes(st, params))
            })
            .map_err(HostessError::CheckPassport)?;

        debug!("checked passenger {checked:?}, boarding closes: {closes}");
        Ok(closes)
    }

    /// Closes boarding and lets the pilot take off. Declares the air lift
    /// finished once every passenger has boarded.
    pub fn signal_ready_to_flight(&mut self) -> Result<(), HostessError> {
        let (flight, in_flight) = self
            .air
            .with_state(|st| {
                st.hostess = HostessStatus::ReadyToFly;
                if st.boarded >= st.n_passengers {
                    st.finished = true;
                }
                self.logger.save_flight_departed(st);
                self.logger.save_state(st);
                (st.flight_number, st.in_flight)
            })
            .map_err(HostessError::SignalReadyToFlight)?;

        debug!("flight {flight} departs with {in_flight} passengers");
        self.air
            .release(Signal::ReadyToFlight)
            .map_err(HostessError::SignalReadyToFlight)
    }
}
