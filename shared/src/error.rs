use std::{fmt, io};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemOp {
    Acquire,
    Release,
}

impl fmt::Display for SemOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SemOp::Acquire => "acquire",
            SemOp::Release => "release",
        })
    }
}

/// A semaphore operation failed. Never recoverable inside the protocol.
#[derive(Debug, thiserror::Error)]
#[error("{op} on semaphore `{sem}` failed")]
pub struct SyncError {
    pub op: SemOp,
    pub sem: &'static str,
    #[source]
    pub source: io::Error,
}

/// An error that ends an actor process.
pub trait Fatal: std::error::Error + Send + Sync + 'static {
    /// Exit status reported for this error; protocol failures by default.
    fn exit_code(&self) -> u8 {
        exit_code::SYNC
    }
}

/// Process exit statuses, one per failure category.
pub mod exit_code {
    /// Malformed arguments or invalid run parameters. Same code clap uses.
    pub const ARGS: u8 = 2;
    /// Creating or attaching the shared region failed.
    pub const ATTACH: u8 = 3;
    /// A semaphore operation failed inside the protocol.
    pub const SYNC: u8 = 4;
    /// Unmapping the shared region failed.
    pub const DETACH: u8 = 5;
    /// The diagnostic stream could not be opened.
    pub const DIAGNOSTICS: u8 = 6;
}
