//! The error type returned by all operations in this crate.

use std::time::Duration;

use seriallink::InstrumentError;
use thiserror::Error;

/// The error enum for the WSS100 driver and the sweep machinery built on it.
///
/// Construction-time errors (`ChannelOutOfRange`, `AttenuationOutOfRange`,
/// `InvalidArgument`) are returned before anything reaches the device.
/// `Transport` and `Protocol` errors are fatal to the command that caused
/// them; the sweep executor catches them per pattern and degrades to
/// abandoning that pattern. `HandshakeTimeout` aborts a run before any
/// pattern is applied.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WssError {
    /// A requested channel lies outside the session's channel range.
    #[error("Channel {channel} is out of range. The channel range is [{start}, {end}]")]
    ChannelOutOfRange {
        /// The channel that was requested.
        channel: u16,
        /// First channel of the range.
        start: u16,
        /// Last channel of the range (inclusive).
        end: u16,
    },
    /// An attenuation value lies outside the device's supported span.
    #[error("Attenuation {value} dB is out of range. Allowed range is [{min}, {max}] dB")]
    AttenuationOutOfRange {
        /// The value that is out of range.
        value: f64,
        /// The minimum attenuation that is allowed.
        min: f64,
        /// The maximum attenuation that is allowed.
        max: f64,
    },
    /// The instrument identity could not be confirmed within the configured
    /// number of handshake attempts.
    #[error("Instrument identity was not confirmed after {attempts} attempts (backoff {backoff:?})")]
    HandshakeTimeout {
        /// Number of attempts that were made.
        attempts: u32,
        /// The backoff that was applied between attempts.
        backoff: Duration,
    },
    /// Error when an invalid argument is passed to a function. This error
    /// contains only a message intended for the user.
    #[error("{0}")]
    InvalidArgument(String),
    /// Error when writing a persisted artifact. See [`std::io::Error`] for
    /// more details.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The instrument responded with something other than the expected
    /// response shape. The offending line is carried in the error.
    #[error("Unexpected response to command '{command}': {response}")]
    Protocol {
        /// The command that was active when the response arrived.
        command: String,
        /// The offending response line.
        response: String,
    },
    /// Error at the session level, i.e., I/O or a timeout. See
    /// [`seriallink::InstrumentError`] for more details.
    #[error(transparent)]
    Transport(#[from] InstrumentError),
    /// The read-back after committing a pattern does not match the pattern
    /// that was sent. The sweep executor treats this as non-fatal and flags
    /// the affected record instead.
    #[error("Read-back after '{command}' does not match the intended pattern: {readback}")]
    VerificationMismatch {
        /// The pattern-set command that was applied.
        command: String,
        /// The read-back line that disagrees with it.
        readback: String,
    },
}
