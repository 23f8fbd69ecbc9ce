//! Provide a serial interface for the WSS100.

use std::time::Duration;

use seriallink::{Instrument, SerialInterface};
use serialport::SerialPort;

use crate::WssError;

/// A SerialInterface for the WSS100.
///
/// Builds a SerialLink interface with the transport configuration the WSS100
/// requires: 115200 baud, 8 data bits, 1 stop bit, no parity.
#[derive(Debug)]
pub struct SerialInterfaceWss {}

impl SerialInterfaceWss {
    /// Try to create an instrument interface with a simple serial port
    /// configuration.
    ///
    /// This is analog to the `simple` method of the `SerialInterface` struct
    /// in `SerialLink`, however, it sets the baud rate, data bits, and stop
    /// bits the WSS100 expects. The default timeout is set to 3 seconds.
    ///
    /// # Arguments
    /// * `port` - The name of the serial port, e.g., `"/dev/ttyUSB0"` or `"COM3"`.
    pub fn simple(port: &str) -> Result<Instrument<Box<dyn SerialPort>>, WssError> {
        let timeout = Duration::from_secs(3);
        let port = serialport::new(port, 115_200)
            .timeout(timeout)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One);
        Ok(SerialInterface::full(port)?)
    }
}
