use std::num::ParseIntError;

pub mod air_lift;
pub mod diagnostics;
pub mod error;
pub mod logger;
pub mod shm;
pub mod state;
pub mod sync;
pub mod trace;

pub use air_lift::{AirLift, Signal};
pub use error::{exit_code, Fatal, SemOp, SyncError};
pub use logger::{read_log, Event, LogRecord, StateLogger};
pub use state::{
    FullState, HostessStatus, Params, ParamsError, PassengerStatus, PilotStatus, MAX_PASSENGERS,
};

pub const MAGIC_VALUE: u32 = 0x4149_524c;

/// Name of the POSIX shared memory object for `key`.
pub fn shm_name(key: u32) -> String {
    format!("/airlift_{key:08x}")
}

/// Parses an access key like `strtol(s, _, 0)`: leading whitespace and one
/// sign are skipped, `0x` prefix for hex, a leading `0` for octal, decimal
/// otherwise. Negative keys wrap around to their unsigned value.
pub fn parse_key(s: &str) -> Result<u32, ParseIntError> {
    let s = s.trim_start();
    let (negative, s) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };

    let hex = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"));
    let (digits, radix) = if let Some(hex) = hex {
        (hex, 16)
    } else if s.len() > 1 && s.starts_with('0') {
        (&s[1..], 8)
    } else {
        (s, 10)
    };

    // `from_str_radix` would take a second sign; a bare sign is an invalid digit
    let digits = if digits.starts_with(['+', '-']) {
        "-"
    } else {
        digits
    };

    let key = u32::from_str_radix(digits, radix)?;
    Ok(if negative { key.wrapping_neg() } else { key })
}
