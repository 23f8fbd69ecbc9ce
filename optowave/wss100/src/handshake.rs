//! Bounded identity verification for a freshly opened instrument session.
//!
//! A session starts out unverified: nothing is known about what sits on the
//! other end of the serial link. [`establish`] clears the device error queue
//! and queries its identity, retrying with a backoff until the identity is
//! confirmed or the attempt bound is exhausted. The bound exists because
//! unattended sweeps must not hang forever on a disconnected or misconfigured
//! instrument; a run that cannot verify its device fails before any pattern
//! is applied.

use std::{thread, time::Duration};

use seriallink::InstrumentInterface;

use crate::{Wss100, WssError};

/// Retry policy for the connection handshake.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandshakeConfig {
    /// Maximum number of verification attempts before giving up.
    pub max_attempts: u32,
    /// Pause between consecutive attempts.
    pub backoff: Duration,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        HandshakeConfig {
            max_attempts: 5,
            backoff: Duration::from_millis(200),
        }
    }
}

/// Verify the instrument identity, retrying within the configured bound.
///
/// Each attempt clears the device error queue (`*CLS`) and issues an identity
/// query (`*IDN?`). A transport failure, a protocol violation, or an empty
/// identity line keeps the session unverified and triggers the next attempt
/// after the configured backoff. On success the identity string is returned;
/// once this function returns `Ok`, the session is considered verified for
/// the rest of the run.
///
/// # Errors
/// Fails with [`WssError::HandshakeTimeout`] after `max_attempts` failed
/// attempts.
pub fn establish<T: InstrumentInterface>(
    wss: &mut Wss100<T>,
    config: &HandshakeConfig,
) -> Result<String, WssError> {
    for attempt in 1..=config.max_attempts {
        match try_verify(wss) {
            Ok(identity) => {
                log::info!("Instrument verified on attempt {attempt}: {identity}");
                return Ok(identity);
            }
            Err(err) => {
                log::warn!(
                    "Handshake attempt {attempt}/{} failed: {err}",
                    config.max_attempts
                );
                if attempt < config.max_attempts {
                    thread::sleep(config.backoff);
                }
            }
        }
    }
    Err(WssError::HandshakeTimeout {
        attempts: config.max_attempts,
        backoff: config.backoff,
    })
}

/// One verification attempt: clear the error queue, then query the identity.
fn try_verify<T: InstrumentInterface>(wss: &mut Wss100<T>) -> Result<String, WssError> {
    wss.clear_errors()?;
    let identity = wss.identify()?;
    if identity.is_empty() {
        return Err(WssError::Protocol {
            command: "*IDN?".to_string(),
            response: identity,
        });
    }
    Ok(identity)
}
