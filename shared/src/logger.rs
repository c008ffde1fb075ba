//! Append-only state log.
//!
//! Every actor appends one CSV record per transition while it holds the
//! state mutex, so the order of records in the file is the order in which
//! the transitions happened.

use std::{
    fs::{File, OpenOptions},
    path::{Path, PathBuf},
};

use anyhow::Context;
use arrayvec::ArrayString;
use serde::{Deserialize, Serialize};

use crate::state::{FullState, HostessStatus, PilotStatus, MAX_PASSENGERS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Event {
    State,
    BoardingStarted,
    PassengerChecked,
    FlightDeparted,
    FlightArrived,
    FlightReturning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub event: Event,
    pub flight: u32,
    pub pilot: PilotStatus,
    pub hostess: HostessStatus,
    pub in_queue: u32,
    pub in_flight: u32,
    pub boarded: u32,
    pub checked: Option<u32>,
    pub finished: bool,
    pub passengers: ArrayString<MAX_PASSENGERS>,
}

impl LogRecord {
    pub fn new(event: Event, state: &FullState) -> Self {
        Self {
            event,
            flight: state.flight_number,
            pilot: state.pilot,
            hostess: state.hostess,
            in_queue: state.in_queue,
            in_flight: state.in_flight,
            boarded: state.boarded,
            checked: state.checked,
            finished: state.finished,
            passengers: state.passenger_codes(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StateLogger {
    path: PathBuf,
}

impl StateLogger {
    /// Logger appending to an existing log.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Truncates `path` and writes the header plus the initial state.
    pub fn create(path: impl Into<PathBuf>, initial: &FullState) -> anyhow::Result<Self> {
        let path = path.into();
        let file = File::create(&path)
            .with_context(|| format!("Creating state log {} failed", path.display()))?;
        let mut writer = csv::Writer::from_writer(file);
        writer.serialize(LogRecord::new(Event::State, initial))?;
        writer.flush()?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record. Failures only reach the diagnostic stream: the
    /// protocol never waits on the log.
    pub fn persist(&self, event: Event, state: &FullState) {
        if let Err(e) = self.append(&LogRecord::new(event, state)) {
            log::warn!(
                "failed to record {event:?} in {}: {e:#}",
                self.path.display()
            );
        }
    }

    pub fn save_state(&self, state: &FullState) {
        self.persist(Event::State, state);
    }

    pub fn save_boarding_started(&self, state: &FullState) {
        self.persist(Event::BoardingStarted, state);
    }

    pub fn save_passenger_checked(&self, state: &FullState) {
        self.persist(Event::PassengerChecked, state);
    }

    pub fn save_flight_departed(&self, state: &FullState) {
        self.persist(Event::FlightDeparted, state);
    }

    pub fn save_flight_arrived(&self, state: &FullState) {
        self.persist(Event::FlightArrived, state);
    }

    pub fn save_flight_returning(&self, state: &FullState) {
        self.persist(Event::FlightReturning, state);
    }

    fn append(&self, record: &LogRecord) -> anyhow::Result<()> {
        let file = OpenOptions::new().append(true).open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.serialize(record)?;
        writer.flush()?;
        Ok(())
    }
}

/// Reads back every record of a state log.
pub fn read_log(path: impl AsRef<Path>) -> anyhow::Result<Vec<LogRecord>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Opening state log {} failed", path.display()))?;
    let records: Result<Vec<LogRecord>, _> = reader.deserialize().collect();
    records.with_context(|| format!("Malformed state log {}", path.display()))
}

#[cfg(test)]
mod test {
    use std::fs;

    use super::*;
    use crate::state::PassengerStatus;

    #[test]
    fn records_come_back_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("airlift.log");

        let mut state = FullState::new(2);
        let logger = StateLogger::create(&path, &state).unwrap();

        state.pilot = PilotStatus::ReadyForBoarding;
        state.flight_number = 1;
        logger.save_state(&state);
        logger.save_boarding_started(&state);

        state.passengers[0] = PassengerStatus::InFlight;
        state.checked = Some(0);
        state.in_flight = 1;
        state.boarded = 1;
        logger.save_passenger_checked(&state);

        let records = read_log(&path).unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[0], LogRecord::new(Event::State, &FullState::new(2)));
        assert_eq!(records[1].pilot, PilotStatus::ReadyForBoarding);
        assert_eq!(records[2].event, Event::BoardingStarted);
        assert_eq!(records[3].event, Event::PassengerChecked);
        assert_eq!(records[3].checked, Some(0));
        assert_eq!(records[3].passengers.as_str(), "FG");
    }

    #[test]
    fn header_names_the_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("airlift.log");
        StateLogger::create(&path, &FullState::new(1)).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("event,flight,pilot,hostess,in_queue,in_flight,boarded,checked,finished,passengers")
        );
        assert_eq!(
            lines.next(),
            Some("STATE,0,FLYING_BACK,WAIT_FOR_NEXT_FLIGHT,0,0,0,,false,G")
        );
    }

    #[test]
    fn missing_log_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let logger = StateLogger::new(dir.path().join("missing").join("airlift.log"));
        logger.save_state(&FullState::new(1));
        assert!(read_log(logger.path()).is_err());
    }
}
