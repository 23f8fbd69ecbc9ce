//! Serial-port backed instrument sessions using the [`serialport`] crate.

use std::time::Duration;

use serialport::{SerialPort, SerialPortBuilder};

use crate::{Instrument, InstrumentError};

/// Constructors for serial-port backed instrument sessions.
///
/// Device crates typically wrap these in their own helper that fills in the
/// baud rate, data bits, and stop bits their hardware requires.
#[derive(Debug)]
pub struct SerialInterface {}

impl SerialInterface {
    /// Open a serial instrument session with a simple configuration.
    ///
    /// The port is opened with the `serialport` defaults (8 data bits, one
    /// stop bit, no parity) and a timeout of 3 seconds.
    ///
    /// # Arguments
    /// * `port` - The name of the serial port, e.g., `"/dev/ttyUSB0"` or `"COM3"`.
    /// * `baud_rate` - The baud rate to use.
    pub fn simple(
        port: &str,
        baud_rate: u32,
    ) -> Result<Instrument<Box<dyn SerialPort>>, InstrumentError> {
        let builder = serialport::new(port, baud_rate).timeout(Duration::from_secs(3));
        Self::full(builder)
    }

    /// Open a serial instrument session from a fully configured builder.
    ///
    /// Use this when the device needs a specific parity, data bits, stop bits,
    /// or timeout configuration. The session timeout is taken from the opened
    /// port.
    ///
    /// # Arguments
    /// * `builder` - A [`serialport::SerialPortBuilder`], see [`serialport::new`].
    pub fn full(
        builder: SerialPortBuilder,
    ) -> Result<Instrument<Box<dyn SerialPort>>, InstrumentError> {
        let port = builder.open()?;
        let timeout = port.timeout();
        Ok(Instrument::new(port, timeout))
    }
}
