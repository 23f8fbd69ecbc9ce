//! SerialLink: line-oriented instrument sessions for lab automation.
//!
//! This crate provides the [`InstrumentInterface`] trait that device drivers are
//! written against, together with implementations of it:
//!
//! - [`Instrument`], a generic wrapper around anything that implements
//!   [`std::io::Read`] and [`std::io::Write`], e.g., a serial port or a TCP
//!   stream.
//! - [`SerialInterface`], constructors for serial-port backed instruments using
//!   the [`serialport`] crate (behind the `serial` feature).
//! - [`LoopbackInterface`], a scripted in-memory interface for driver tests.
//!
//! The trait models the half-duplex request/response style common to
//! line-oriented lab equipment: commands are single lines, a configurable
//! terminator is appended on write and stripped on read, and responses are read
//! until the terminator arrives or the session timeout expires.
//!
//! # Example
//!
//! A minimal driver that queries an instrument for its identity:
//!
//! ```
//! use seriallink::{InstrumentError, InstrumentInterface, LoopbackInterface};
//!
//! struct MyDriver<T: InstrumentInterface> {
//!     interface: T,
//! }
//!
//! impl<T: InstrumentInterface> MyDriver<T> {
//!     fn identify(&mut self) -> Result<String, InstrumentError> {
//!         self.interface.query("*IDN?")
//!     }
//! }
//!
//! let loopback = LoopbackInterface::new(vec!["*IDN?"], vec!["ACME,MOD1,1234"], "\n");
//! let mut driver = MyDriver { interface: loopback };
//! assert_eq!("ACME,MOD1,1234", driver.identify().unwrap());
//! ```

#![warn(missing_docs)]

mod instrument;
mod loopback;
#[cfg(feature = "serial")]
mod serial;

pub use instrument::{Instrument, InstrumentError};
pub use loopback::LoopbackInterface;
#[cfg(feature = "serial")]
pub use serial::SerialInterface;

use std::time::{Duration, Instant};

/// The interface trait all instrument sessions implement.
///
/// Implementors provide raw byte transfer plus terminator and timeout
/// bookkeeping; the line-level helpers (`sendcmd`, `query`,
/// `read_until_terminator`, `check_acknowledgment`) are provided on top of
/// those primitives and should normally not be overridden.
pub trait InstrumentInterface {
    /// Read exactly `buf.len()` bytes from the instrument.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), InstrumentError>;

    /// Write raw bytes to the instrument without appending the terminator.
    fn write_raw(&mut self, data: &[u8]) -> Result<(), InstrumentError>;

    /// Get the current line terminator.
    fn get_terminator(&self) -> &str {
        "\n"
    }

    /// Set the line terminator used for both writing and reading.
    fn set_terminator(&mut self, _terminator: &str) {}

    /// Get the timeout for reading a full response line.
    fn get_timeout(&self) -> Duration {
        Duration::from_secs(3)
    }

    /// Send a command to the instrument.
    ///
    /// The terminator is appended to the command before writing.
    fn sendcmd(&mut self, cmd: &str) -> Result<(), InstrumentError> {
        let full_cmd = format!("{cmd}{}", self.get_terminator());
        self.write_raw(full_cmd.as_bytes())
    }

    /// Write a string to the instrument as-is, without the terminator.
    fn write(&mut self, data: &str) -> Result<(), InstrumentError> {
        self.write_raw(data.as_bytes())
    }

    /// Read one response line from the instrument.
    ///
    /// Bytes are read one at a time until the line ends with the terminator.
    /// The returned string is trimmed of the terminator and surrounding
    /// whitespace. Non-UTF-8 bytes are reported on stderr and skipped. If no
    /// terminator arrives within the session timeout, a
    /// [`InstrumentError::Timeout`] is returned.
    fn read_until_terminator(&mut self) -> Result<String, InstrumentError> {
        let mut response = String::new();
        let mut single_buf = [0u8];

        let tic = Instant::now();
        let mut timeout_occured = true;

        while tic.elapsed() < self.get_timeout() {
            self.read_exact(&mut single_buf)?;
            if let Ok(val) = str::from_utf8(&single_buf) {
                response.push_str(val);
            } else {
                eprintln!("Received invalid UTF-8 data: {single_buf:?}");
            }
            if response.ends_with(self.get_terminator()) {
                timeout_occured = false;
                break;
            }
        }

        if timeout_occured {
            Err(InstrumentError::Timeout(self.get_timeout()))
        } else {
            Ok(response.trim().to_string())
        }
    }

    /// Query the instrument with a command and return the response line.
    fn query(&mut self, cmd: &str) -> Result<String, InstrumentError> {
        self.sendcmd(cmd)?;
        match self.read_until_terminator() {
            Err(InstrumentError::Timeout(timeout)) => Err(InstrumentError::TimeoutQuery {
                query: cmd.to_string(),
                timeout,
            }),
            other => other,
        }
    }

    /// Read one response line and check it against an expected acknowledgment.
    ///
    /// Returns [`InstrumentError::NotAcknowledged`] with the actual response if
    /// it differs from `expected`.
    fn check_acknowledgment(&mut self, expected: &str) -> Result<(), InstrumentError> {
        let response = self.read_until_terminator()?;
        if response == expected {
            Ok(())
        } else {
            Err(InstrumentError::NotAcknowledged(response))
        }
    }
}
