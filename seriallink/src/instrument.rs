//! Generic instrument session over any [`std::io::Read`] + [`std::io::Write`] port.

use std::time::Duration;

use thiserror::Error;

use crate::InstrumentInterface;

/// An instrument session built from any port that implements [`std::io::Read`]
/// and [`std::io::Write`].
///
/// This is the type all concrete transports reduce to: a serial port, a TCP
/// stream, or an in-memory buffer in tests. The terminator defaults to `"\n"`
/// and can be changed with [`InstrumentInterface::set_terminator`].
///
/// # Example
///
/// ```no_run
/// use std::{net::TcpStream, time::Duration};
///
/// use seriallink::Instrument;
///
/// let stream = TcpStream::connect("192.168.10.1:8000").unwrap();
/// let session = Instrument::new(stream, Duration::from_secs(3));
/// ```
pub struct Instrument<P: std::io::Read + std::io::Write> {
    port: P,
    terminator: String,
    timeout: Duration,
}

impl<P: std::io::Read + std::io::Write> Instrument<P> {
    /// Create a new instrument session with a given port and read timeout.
    pub fn new(port: P, timeout: Duration) -> Self {
        Self {
            port,
            terminator: "\n".to_string(),
            timeout,
        }
    }
}

impl<P: std::io::Read + std::io::Write> InstrumentInterface for Instrument<P> {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), InstrumentError> {
        self.port.read_exact(buf)?;
        Ok(())
    }

    fn write_raw(&mut self, data: &[u8]) -> Result<(), InstrumentError> {
        self.port.write_all(data)?;
        self.port.flush()?;
        Ok(())
    }

    fn get_terminator(&self) -> &str {
        self.terminator.as_str()
    }

    fn set_terminator(&mut self, terminator: &str) {
        self.terminator = terminator.to_string();
    }

    fn get_timeout(&self) -> Duration {
        self.timeout
    }
}

/// The error enum for all instrument sessions.
///
/// Drivers return this error (or wrap it in their own error type) for any
/// command or query, such that transport failures propagate with the `?`
/// operator.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InstrumentError {
    /// The instrument did not acknowledge the command that was sent. The
    /// response that was received instead is carried in the error.
    #[error("Instrument did not acknowledge the command sent, but responded with: {0}")]
    NotAcknowledged(String),
    /// Error when reading from/writing to an interface. See [`std::io::Error`]
    /// for more details.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[cfg(feature = "serial")]
    /// Serial port errors can occur when opening a serial interface. See the
    /// [`serialport::Error`] documentation for more information.
    #[error(transparent)]
    Serialport(#[from] serialport::Error),
    /// Timeout occurred while waiting for a response from the instrument.
    #[error(
        "Timeout occured while waiting for a response from the instrument. Timeout was set to {0:?}."
    )]
    Timeout(Duration),
    /// Timeout occurred while waiting for a response to a specific query.
    #[error(
        "Timeout occured while waiting for a response to query: {query}. Timeout was set to {timeout:?}."
    )]
    TimeoutQuery {
        /// The query that timed out.
        query: String,
        /// The timeout that was set.
        timeout: Duration,
    },
}
