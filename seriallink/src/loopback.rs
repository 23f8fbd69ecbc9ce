//! A scripted in-memory interface for testing instrument drivers.

use std::collections::VecDeque;

use crate::{InstrumentError, InstrumentInterface};

/// A loopback interface that plays back a scripted command/response exchange.
///
/// The interface is initialized with the commands the driver is expected to
/// send and the responses the instrument would return, both in order. Every
/// write is asserted against the next expected command, reads are served from
/// the next scripted response. When the interface is dropped, it panics if any
/// scripted traffic was left unconsumed, so a test cannot silently skip part
/// of an exchange.
///
/// # Example
///
/// ```
/// use seriallink::{InstrumentInterface, LoopbackInterface};
///
/// let mut loopback = LoopbackInterface::new(vec!["*IDN?"], vec!["ACME,MOD1,1234"], "\n");
/// assert_eq!("ACME,MOD1,1234", loopback.query("*IDN?").unwrap());
/// ```
pub struct LoopbackInterface {
    from_host: VecDeque<String>,
    from_inst: VecDeque<String>,
    terminator_exp: String,
    curr_bytes: VecDeque<u8>,
    terminator: String,
}

impl LoopbackInterface {
    /// Create a new loopback interface with scripted traffic.
    ///
    /// # Arguments
    /// * `from_host` - Commands expected from the driver, in order, without terminator.
    /// * `from_inst` - Responses the instrument returns, in order, without terminator.
    /// * `terminator_exp` - The terminator the driver is expected to use.
    pub fn new<S: Into<String>>(
        from_host: Vec<S>,
        from_inst: Vec<S>,
        terminator_exp: &str,
    ) -> Self {
        LoopbackInterface {
            from_host: from_host.into_iter().map(Into::into).collect(),
            from_inst: from_inst.into_iter().map(Into::into).collect(),
            terminator_exp: terminator_exp.to_string(),
            curr_bytes: VecDeque::new(),
            terminator: "\n".to_string(), // interface default, drivers override it
        }
    }

    /// Panic if any scripted traffic has not been consumed.
    ///
    /// This is called automatically when the interface is dropped, but can
    /// also be called explicitly at the end of a test.
    pub fn finalize(&mut self) {
        if let Some(leftover) = self.from_host.front() {
            panic!("Leftover expected commands found from host to instrument: {leftover}");
        }
        if let Some(leftover) = self.from_inst.front() {
            panic!("Leftover expected commands found from instrument to host: {leftover}");
        }
    }

    /// Assert that the driver configured the terminator this script expects.
    pub fn test_terminator(&self, expected: &str) {
        assert_eq!(
            expected, self.terminator,
            "Expected terminator '{expected}', got '{}'",
            self.terminator
        );
    }

    /// Pop the next expected command from the host, or panic.
    fn next_from_host(&mut self) -> String {
        self.from_host
            .pop_front()
            .expect("No more commands were expected from host to instrument.")
    }

    /// Pop the next scripted response from the instrument, or panic.
    fn next_from_inst(&mut self) -> String {
        self.from_inst
            .pop_front()
            .expect("No more commands were expected from instrument to host.")
    }

    /// Read a single byte of the current scripted response, refilling from the
    /// script when the current response line is exhausted.
    fn read_one_byte(&mut self) -> u8 {
        match self.curr_bytes.pop_front() {
            Some(byte) => byte,
            None => {
                let next_line = format!("{}{}", self.next_from_inst(), self.terminator_exp);
                self.curr_bytes = next_line.into_bytes().into();
                self.read_one_byte()
            }
        }
    }
}

impl InstrumentInterface for LoopbackInterface {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), InstrumentError> {
        for byte in buf.iter_mut() {
            *byte = self.read_one_byte();
        }
        Ok(())
    }

    fn write_raw(&mut self, cmd: &[u8]) -> Result<(), InstrumentError> {
        let exp = format!("{}{}", self.next_from_host(), self.terminator_exp);
        assert_eq!(
            exp.as_bytes(),
            cmd,
            "Expected sendcmd '{exp}', got '{:?}'",
            str::from_utf8(cmd)
        );
        Ok(())
    }

    fn get_terminator(&self) -> &str {
        self.terminator.as_str()
    }

    fn set_terminator(&mut self, terminator: &str) {
        self.terminator = terminator.to_string();
    }
}

impl Drop for LoopbackInterface {
    fn drop(&mut self) {
        // Skip the leftover check when already panicking, a double panic would
        // abort and mask the original assertion message.
        if !std::thread::panicking() {
            self.finalize();
        }
    }
}
