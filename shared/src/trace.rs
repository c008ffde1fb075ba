//! Offline checks over a state log.

use crate::{
    logger::{Event, LogRecord},
    state::{PassengerStatus, PilotStatus},
};

/// A protocol violation found in a state log. `record` is the 1-based index
/// of the offending record (the header is not counted).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    #[error("record {record}: pilot went from {from:?} to {to:?}")]
    PilotTransition {
        record: usize,
        from: PilotStatus,
        to: PilotStatus,
    },
    #[error("record {record}: flight number changed from {from} to {to} while pilot is {pilot:?}")]
    FlightCounter {
        record: usize,
        from: u32,
        to: u32,
        pilot: PilotStatus,
    },
    #[error("record {record}: pilot became ready for boarding without a new flight number")]
    MissingIncrement { record: usize },
    #[error("record {record}: flight departed with no passengers aboard")]
    EmptyDeparture { record: usize },
    #[error("record {record}: flight departed with {in_flight} passengers, capacity is {max}")]
    OverCapacity {
        record: usize,
        in_flight: u32,
        max: u32,
    },
    #[error("record {record}: plane returning with {in_flight} passengers aboard")]
    NotEmpty { record: usize, in_flight: u32 },
    #[error("run finished but {stranded} passengers never reached the destination")]
    Stranded { stranded: usize },
    #[error("run finished but only {boarded} of {expected} passengers boarded")]
    MissingPassengers { boarded: u32, expected: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceSummary {
    pub records: usize,
    pub flights: u32,
    /// Passengers aboard at each departure, in flight order.
    pub departures: Vec<u32>,
    pub finished: bool,
    pub violations: Vec<Violation>,
}

impl TraceSummary {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Replays `records` and collects every violation of the flight protocol.
pub fn check(records: &[LogRecord], max_capacity: Option<u32>) -> TraceSummary {
    let mut summary = TraceSummary {
        records: records.len(),
        ..TraceSummary::default()
    };

    let mut prev: Option<&LogRecord> = None;
    for (index, rec) in records.iter().enumerate() {
        let record = index + 1;

        if let Some(prev) = prev {
            check_pilot(prev, rec, record, &mut summary.violations);
        }

        match rec.event {
            Event::BoardingStarted => summary.flights += 1,
            Event::FlightDeparted => {
                summary.departures.push(rec.in_flight);
                if rec.in_flight == 0 {
                    summary.violations.push(Violation::EmptyDeparture { record });
                }
                if let Some(max) = max_capacity.filter(|max| rec.in_flight > *max) {
                    summary.violations.push(Violation::OverCapacity {
                        record,
                        in_flight: rec.in_flight,
                        max,
                    });
                }
            }
            Event::FlightReturning if rec.in_flight != 0 => {
                summary.violations.push(Violation::NotEmpty {
                    record,
                    in_flight: rec.in_flight,
                });
            }
            _ => {}
        }

        prev = Some(rec);
    }

    if let Some(last) = records.last().filter(|r| r.finished) {
        summary.finished = true;
        check_completion(last, &mut summary.violations);
    }

    summary
}

fn check_pilot(prev: &LogRecord, rec: &LogRecord, record: usize, out: &mut Vec<Violation>) {
    let moved = rec.pilot != prev.pilot;
    if moved && rec.pilot != prev.pilot.next() {
        out.push(Violation::PilotTransition {
            record,
            from: prev.pilot,
            to: rec.pilot,
        });
    }

    let boarding = moved && rec.pilot == PilotStatus::ReadyForBoarding;
    if rec.flight != prev.flight {
        if !boarding || rec.flight != prev.flight.wrapping_add(1) {
            out.push(Violation::FlightCounter {
                record,
                from: prev.flight,
                to: rec.flight,
                pilot: rec.pilot,
            });
        }
    } else if boarding {
        out.push(Violation::MissingIncrement { record });
    }
}

fn check_completion(last: &LogRecord, out: &mut Vec<Violation>) {
    let stranded = last
        .passengers
        .chars()
        .filter(|c| PassengerStatus::from_code(*c) != Some(PassengerStatus::AtDestination))
        .count();
    if stranded > 0 {
        out.push(Violation::Stranded { stranded });
    }

    let expected = last.passengers.len();
    if last.boarded as usize != expected {
        out.push(Violation::MissingPassengers {
            boarded: last.boarded,
            expected,
        });
    }
}
