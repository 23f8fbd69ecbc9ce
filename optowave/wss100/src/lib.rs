//! A rust driver for the Optowave WSS100 channel-attenuation switch, plus the
//! sweep machinery to characterize a channel range with it.
//!
//! The WSS100 speaks a line-oriented command/response protocol over a serial
//! link. Attenuation patterns are staged with a `URA` command, committed with
//! `RSW`, and can be read back with `RRA?` for confirmation. This crate
//! provides:
//!
//! - [`pattern`]: pure generators for per-channel attenuation patterns.
//! - [`Wss100`]: the device driver, including the line-protocol framing.
//! - [`handshake`]: bounded identity verification before a run.
//! - [`sweep`]: the executor that applies a plan of patterns and
//!   synchronizes each with a voltage acquisition.
//! - [`record`]: persistence of acquisition blocks as text files.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use optowave_wss100::{
//!     ChannelRange, HandshakeConfig, SerialInterfaceWss, Wss100, handshake,
//! };
//!
//! let serial_inst = SerialInterfaceWss::simple("/dev/ttyUSB0").expect("Failed to open serial port");
//! let mut wss = Wss100::try_new(serial_inst).unwrap();
//!
//! // Verify we are talking to the right instrument before doing anything else.
//! let identity = handshake::establish(&mut wss, &HandshakeConfig::default()).unwrap();
//! println!("Connected to: {identity}");
//!
//! // Turn every channel of the universe on.
//! let range = ChannelRange::new(52, 87).unwrap();
//! let baseline = optowave_wss100::ChannelPattern::uniform(range, 0.0).unwrap();
//! let readback = wss.apply_pattern(&baseline).unwrap();
//! println!("Device now reports: {readback}");
//! ```

#![warn(missing_docs)]

mod acquire;
mod error;
pub mod handshake;
mod interface;
pub mod pattern;
mod record;
pub mod sweep;

pub use acquire::{AcquisitionBlock, AcquisitionSettings, AcquisitionSource};
pub use error::WssError;
pub use handshake::HandshakeConfig;
pub use interface::SerialInterfaceWss;
pub use pattern::{ATTEN_OFF, ATTEN_ON, ChannelPattern, ChannelRange, DEFAULT_PORT};
pub use record::{AcquisitionRecord, ResultRecorder, SampleStore, TextFileStore};
pub use sweep::{CancelToken, StepOutcome, SweepExecutor, SweepPlan, SweepReport, SweepStep};

use std::sync::{Arc, Mutex};

use seriallink::InstrumentInterface;

/// The acknowledgement token the device sends as the last line of every
/// response.
const ACK: &str = "OK";

/// Prefix of the pattern-set command.
const CMD_SET_PREFIX: &str = "URA";
/// Commit command that makes a staged pattern active.
const CMD_COMMIT: &str = "RSW";
/// Query for the currently active attenuation of all channels.
const CMD_READ_ALL: &str = "RRA?";
/// Query for the device serial number.
const CMD_SERIAL_NUMBER: &str = "SNO?";
/// Query for the device manufacture date.
const CMD_MANUFACTURE_DATE: &str = "MFD?";
/// Query for the oldest entry of the device error queue.
const CMD_ERROR_QUEUE: &str = "SYSTem:ERRor?";
/// Clear the device error queue.
const CMD_CLEAR: &str = "*CLS";
/// Identity query.
const CMD_IDENTIFY: &str = "*IDN?";

/// Tolerance when comparing read-back attenuations against the intended
/// pattern. The device reports with one decimal place.
const ATTEN_TOLERANCE: f64 = 0.05;

/// A rust driver for the Optowave WSS100.
///
/// The device distinguishes write commands (pattern-set, commit, clear) from
/// query commands (identity, serial number, read-back), but both categories
/// answer with exactly two lines: a result or echo-plus-value line, then the
/// literal acknowledgement `OK`. The driver always consumes both lines; a
/// query returns the first one.
///
/// See the crate-level documentation for a usage example.
pub struct Wss100<T: InstrumentInterface> {
    interface: Arc<Mutex<T>>,
}

impl<T: InstrumentInterface> Wss100<T> {
    /// Create a new WSS100 instance with the given instrument interface.
    ///
    /// The device terminates lines with `"\r\n"` in both directions; the
    /// interface terminator is set accordingly.
    ///
    /// # Arguments
    /// * `interface` - An instrument interface that implements the
    ///   [`InstrumentInterface`] trait.
    pub fn try_new(interface: T) -> Result<Self, WssError> {
        let mut intf = interface;
        intf.set_terminator("\r\n");
        Ok(Wss100 {
            interface: Arc::new(Mutex::new(intf)),
        })
    }

    /// Query the identity of the instrument.
    pub fn identify(&mut self) -> Result<String, WssError> {
        self.exchange(CMD_IDENTIFY)
    }

    /// Query the serial number of the instrument.
    pub fn serial_number(&mut self) -> Result<String, WssError> {
        self.exchange(CMD_SERIAL_NUMBER)
    }

    /// Query the manufacture date of the instrument.
    pub fn manufacture_date(&mut self) -> Result<String, WssError> {
        self.exchange(CMD_MANUFACTURE_DATE)
    }

    /// Query the oldest entry of the device error queue.
    pub fn next_error(&mut self) -> Result<String, WssError> {
        self.exchange(CMD_ERROR_QUEUE)
    }

    /// Clear the device error queue.
    pub fn clear_errors(&mut self) -> Result<(), WssError> {
        self.exchange(CMD_CLEAR)?;
        Ok(())
    }

    /// Read back the currently active attenuation of all channels.
    pub fn read_all(&mut self) -> Result<String, WssError> {
        self.exchange(CMD_READ_ALL)
    }

    /// Stage an attenuation pattern on the device without committing it.
    pub fn set_pattern(&mut self, pattern: &ChannelPattern) -> Result<(), WssError> {
        self.exchange(&encode_pattern(pattern))?;
        Ok(())
    }

    /// Commit the currently staged pattern, making it physically active.
    pub fn commit(&mut self) -> Result<(), WssError> {
        self.exchange(CMD_COMMIT)?;
        Ok(())
    }

    /// Stage, commit, and read back an attenuation pattern.
    ///
    /// The device uses a two-phase configuration model: a pattern is first
    /// staged (`URA`), then committed in a separate operation (`RSW`), and
    /// can afterwards be confirmed externally (`RRA?`). This method performs
    /// all three steps and returns the read-back text. Use
    /// [`readback_matches`] to check the read-back against the intended
    /// pattern.
    pub fn apply_pattern(&mut self, pattern: &ChannelPattern) -> Result<String, WssError> {
        self.set_pattern(pattern)?;
        self.commit()?;
        self.read_all()
    }

    /// Send one command and consume its two response lines.
    ///
    /// Returns the first response line; fails with [`WssError::Protocol`] if
    /// the second line is not the acknowledgement token.
    fn exchange(&mut self, cmd: &str) -> Result<String, WssError> {
        let mut intf = self.interface.lock().expect("Mutex should not be poisoned");
        intf.sendcmd(cmd)?;
        let result = intf.read_until_terminator()?;
        let ack = intf.read_until_terminator()?;
        if ack != ACK {
            return Err(WssError::Protocol {
                command: cmd.to_string(),
                response: ack,
            });
        }
        log::debug!("{cmd} -> {result}");
        Ok(result)
    }
}

/// Encode a pattern as the device's pattern-set command.
///
/// One line listing every channel of the range in ascending order as
/// `channel,port,attenuation` triples, semicolon-separated, under the `URA`
/// prefix. Attenuations are written with one decimal place, the resolution
/// the device reports back.
pub fn encode_pattern(pattern: &ChannelPattern) -> String {
    let body = pattern
        .entries()
        .map(|(channel, level)| format!("{channel},{},{level:.1}", pattern.port()))
        .collect::<Vec<String>>()
        .join(";");
    format!("{CMD_SET_PREFIX} {body}")
}

/// Decode a pattern-set command or read-back line into a pattern.
///
/// Accepts an optional leading keyword (`URA`, `RRA`, ...) followed by
/// semicolon-separated `channel,port,attenuation` triples. The triples must
/// form a contiguous ascending channel range and share one port.
pub fn decode_pattern(text: &str) -> Result<ChannelPattern, WssError> {
    let text = text.trim();
    let body = match text.split_once(' ') {
        Some((keyword, rest)) if keyword.chars().all(|c| c.is_ascii_alphabetic() || c == '?') => {
            rest
        }
        _ => text,
    };

    let mut channels: Vec<u16> = Vec::new();
    let mut ports: Vec<u8> = Vec::new();
    let mut levels: Vec<f64> = Vec::new();
    for entry in body.split(';').filter(|e| !e.trim().is_empty()) {
        let fields: Vec<&str> = entry.trim().split(',').collect();
        if fields.len() != 3 {
            return Err(malformed(entry));
        }
        channels.push(fields[0].parse().map_err(|_| malformed(entry))?);
        ports.push(fields[1].parse().map_err(|_| malformed(entry))?);
        levels.push(fields[2].parse().map_err(|_| malformed(entry))?);
    }

    let (&first, &last) = match (channels.first(), channels.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => {
            return Err(WssError::InvalidArgument(format!(
                "Pattern text contains no channel entries: '{text}'"
            )));
        }
    };
    if !channels.windows(2).all(|w| w[1] == w[0] + 1) {
        return Err(WssError::InvalidArgument(format!(
            "Pattern channels are not contiguous ascending: '{text}'"
        )));
    }
    let port = ports[0];
    if !ports.iter().all(|&p| p == port) {
        return Err(WssError::InvalidArgument(format!(
            "Pattern entries use more than one port: '{text}'"
        )));
    }

    let range = ChannelRange::new(first, last)?;
    Ok(ChannelPattern::from_levels(range, levels)?.with_port(port))
}

/// Check a read-back line against the pattern it is supposed to confirm.
///
/// The read-back matches if it decodes to the same channel range and port,
/// with every attenuation within [`ATTEN_TOLERANCE`] of the intended value.
/// An unparseable read-back counts as a mismatch.
pub fn readback_matches(pattern: &ChannelPattern, readback: &str) -> bool {
    let Ok(reported) = decode_pattern(readback) else {
        return false;
    };
    if reported.range() != pattern.range() || reported.port() != pattern.port() {
        return false;
    }
    pattern
        .entries()
        .zip(reported.entries())
        .all(|((_, intended), (_, actual))| (intended - actual).abs() <= ATTEN_TOLERANCE)
}

fn malformed(entry: &str) -> WssError {
    WssError::InvalidArgument(format!("Malformed pattern entry '{}'", entry.trim()))
}
