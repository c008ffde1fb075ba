//! Shared flight state and run parameters.

use std::time::Duration;

use arrayvec::ArrayString;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Upper bound on passengers per run; the passenger table is a fixed array
/// so the whole state fits in one shared mapping.
pub const MAX_PASSENGERS: usize = 64;

/// Lower bound of every travel and flight delay.
const MIN_DELAY_US: u64 = 100;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PilotStatus {
    FlyingBack,
    ReadyForBoarding,
    WaitingForBoarding,
    Flying,
    DroppingPassengers,
}

impl PilotStatus {
    /// The status that must follow this one within a cycle.
    pub fn next(self) -> Self {
        match self {
            PilotStatus::FlyingBack => PilotStatus::ReadyForBoarding,
            PilotStatus::ReadyForBoarding => PilotStatus::WaitingForBoarding,
            PilotStatus::WaitingForBoarding => PilotStatus::Flying,
            PilotStatus::Flying => PilotStatus::DroppingPassengers,
            PilotStatus::DroppingPassengers => PilotStatus::FlyingBack,
        }
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HostessStatus {
    WaitForNextFlight,
    WaitForPassenger,
    CheckPassenger,
    ReadyToFly,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PassengerStatus {
    GoingToAirport,
    InQueue,
    InFlight,
    AtDestination,
}

impl PassengerStatus {
    pub fn code(self) -> char {
        match self {
            PassengerStatus::GoingToAirport => 'G',
            PassengerStatus::InQueue => 'Q',
            PassengerStatus::InFlight => 'F',
            PassengerStatus::AtDestination => 'D',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'G' => Some(PassengerStatus::GoingToAirport),
            'Q' => Some(PassengerStatus::InQueue),
            'F' => Some(PassengerStatus::InFlight),
            'D' => Some(PassengerStatus::AtDestination),
            _ => None,
        }
    }
}

/// Everything the actors share, guarded by the `mutex` semaphore of
/// [`crate::AirLift`].
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullState {
    pub pilot: PilotStatus,
    pub hostess: HostessStatus,
    pub passengers: [PassengerStatus; MAX_PASSENGERS],
    pub n_passengers: u32,
    pub flight_number: u32,
    pub in_queue: u32,
    pub in_flight: u32,
    pub boarded: u32,
    pub checked: Option<u32>,
    pub finished: bool,
}

impl FullState {
    pub fn new(n_passengers: u32) -> Self {
        Self {
            pilot: PilotStatus::FlyingBack,
            hostess: HostessStatus::WaitForNextFlight,
            passengers: [PassengerStatus::GoingToAirport; MAX_PASSENGERS],
            n_passengers,
            flight_number: 0,
            in_queue: 0,
            in_flight: 0,
            boarded: 0,
            checked: None,
            finished: false,
        }
    }

    /// Statuses of the passengers taking part in the run.
    pub fn active_passengers(&self) -> &[PassengerStatus] {
        &self.passengers[..self.n_passengers as usize]
    }

    /// One status code per passenger, as written to the state log.
    pub fn passenger_codes(&self) -> ArrayString<MAX_PASSENGERS> {
        let mut codes = ArrayString::new();
        for status in self.active_passengers() {
            codes.push(status.code());
        }
        codes
    }
}

/// Run parameters, fixed by the simulator before any actor attaches.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Params {
    pub passengers: u32,
    pub min_capacity: u32,
    pub max_capacity: u32,
    pub max_flight_us: u64,
    pub max_travel_us: u64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            passengers: 21,
            min_capacity: 5,
            max_capacity: 10,
            max_flight_us: 1_000,
            max_travel_us: 100_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParamsError {
    #[error("passenger count must be between 1 and {MAX_PASSENGERS}, got {0}")]
    Passengers(u32),
    #[error("minimum capacity must be at least 1")]
    MinCapacity,
    #[error("minimum capacity {min} exceeds maximum capacity {max}")]
    CapacityRange { min: u32, max: u32 },
}

impl Params {
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.passengers == 0 || self.passengers as usize > MAX_PASSENGERS {
            return Err(ParamsError::Passengers(self.passengers));
        }
        if self.min_capacity == 0 {
            return Err(ParamsError::MinCapacity);
        }
        if self.min_capacity > self.max_capacity {
            return Err(ParamsError::CapacityRange {
                min: self.min_capacity,
                max: self.max_capacity,
            });
        }
        Ok(())
    }

    pub fn flight_time(&self, rng: &mut impl Rng) -> Duration {
        delay(rng, self.max_flight_us)
    }

    pub fn travel_time(&self, rng: &mut impl Rng) -> Duration {
        delay(rng, self.max_travel_us)
    }
}

fn delay(rng: &mut impl Rng, max_us: u64) -> Duration {
    Duration::from_micros(MIN_DELAY_US.saturating_add(rng.gen_range(0..=max_us)))
}

#[cfg(test)]
mod test {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    #[test]
    fn pilot_cycle_returns_to_start() {
        let mut status = PilotStatus::FlyingBack;
        let mut seen = vec![status];
        for _ in 0..5 {
            status = status.next();
            seen.push(status);
        }
        assert_eq!(seen.first(), seen.last());
        assert_eq!(
            &seen[1..5],
            &[
                PilotStatus::ReadyForBoarding,
                PilotStatus::WaitingForBoarding,
                PilotStatus::Flying,
                PilotStatus::DroppingPassengers,
            ]
        );
    }

    #[test]
    fn passenger_codes_cover_active_passengers_only() {
        let mut state = FullState::new(3);
        state.passengers[1] = PassengerStatus::InFlight;
        state.passengers[2] = PassengerStatus::AtDestination;
        state.passengers[5] = PassengerStatus::InQueue;
        assert_eq!(state.passenger_codes().as_str(), "GFD");

        for code in state.passenger_codes().chars() {
            let status = PassengerStatus::from_code(code).unwrap();
            assert_eq!(status.code(), code);
        }
        assert_eq!(PassengerStatus::from_code('x'), None);
    }

    #[test]
    fn params_validation() {
        assert_eq!(Params::default().validate(), Ok(()));

        let p = Params {
            passengers: 0,
            ..Params::default()
        };
        assert_eq!(p.validate(), Err(ParamsError::Passengers(0)));

        let p = Params {
            passengers: MAX_PASSENGERS as u32 + 1,
            ..Params::default()
        };
        assert!(matches!(p.validate(), Err(ParamsError::Passengers(_))));

        let p = Params {
            min_capacity: 0,
            ..Params::default()
        };
        assert_eq!(p.validate(), Err(ParamsError::MinCapacity));

        let p = Params {
            min_capacity: 6,
            max_capacity: 5,
            ..Params::default()
        };
        assert_eq!(
            p.validate(),
            Err(ParamsError::CapacityRange { min: 6, max: 5 })
        );
    }

    #[test]
    fn delays_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let params = Params {
            max_flight_us: 50,
            max_travel_us: 0,
            ..Params::default()
        };
        for _ in 0..100 {
            let f = params.flight_time(&mut rng);
            assert!(f >= Duration::from_micros(100) && f <= Duration::from_micros(150));
            assert_eq!(params.travel_time(&mut rng), Duration::from_micros(100));
        }
    }

    #[test]
    fn huge_delay_bound_does_not_overflow() {
        let mut rng = StdRng::seed_from_u64(7);
        let params = Params {
            max_flight_us: u64::MAX,
            max_travel_us: u64::MAX - 1,
            ..Params::default()
        };
        for _ in 0..100 {
            assert!(params.flight_time(&mut rng) >= Duration::from_micros(100));
            assert!(params.travel_time(&mut rng) >= Duration::from_micros(100));
        }
    }
}
