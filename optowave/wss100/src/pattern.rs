//! Channel attenuation patterns and their generators.
//!
//! A [`ChannelPattern`] assigns an attenuation level to every channel of a
//! fixed, contiguous [`ChannelRange`]. Partial patterns do not exist: the
//! device keeps its previous state for channels a command does not mention,
//! so a generator that omitted channels would silently carry attenuation
//! over from one sweep step to the next. All constructors therefore demand a
//! level for the full range.
//!
//! The generators in this module are pure and return structured patterns;
//! turning a pattern into the device's line protocol is the driver's job.

use std::collections::BTreeMap;

use crate::WssError;

/// Attenuation level of a channel that is fully on (no attenuation).
pub const ATTEN_ON: f64 = 0.0;

/// Attenuation sentinel for a channel that is effectively off.
pub const ATTEN_OFF: f64 = 99.9;

/// The switch port patterns are applied to unless overridden.
pub const DEFAULT_PORT: u8 = 3;

/// A fixed, contiguous range of switch channels, both ends inclusive.
///
/// The range defines the channel universe of a session: every pattern built
/// over it assigns a level to each of its channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelRange {
    start: u16,
    end: u16,
}

impl ChannelRange {
    /// Create a new channel range from `start` to `end`, both inclusive.
    pub fn new(start: u16, end: u16) -> Result<Self, WssError> {
        if start > end {
            return Err(WssError::InvalidArgument(format!(
                "Channel range start {start} must not be larger than end {end}"
            )));
        }
        Ok(ChannelRange { start, end })
    }

    /// First channel of the range.
    pub fn start(&self) -> u16 {
        self.start
    }

    /// Last channel of the range (inclusive).
    pub fn end(&self) -> u16 {
        self.end
    }

    /// Number of channels in the range.
    pub fn len(&self) -> usize {
        usize::from(self.end - self.start) + 1
    }

    /// A channel range always holds at least one channel.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Check whether a channel lies inside the range.
    pub fn contains(&self, channel: u16) -> bool {
        channel >= self.start && channel <= self.end
    }

    /// Iterate over all channels in ascending order.
    pub fn channels(&self) -> impl Iterator<Item = u16> + use<> {
        self.start..=self.end
    }

    /// The zero-based position of a channel within the range.
    pub fn index_of(&self, channel: u16) -> Result<usize, WssError> {
        if self.contains(channel) {
            Ok(usize::from(channel - self.start))
        } else {
            Err(WssError::ChannelOutOfRange {
                channel,
                start: self.start,
                end: self.end,
            })
        }
    }
}

/// A full per-channel attenuation assignment for one channel range.
///
/// Patterns are immutable once built; the override constructors return a new
/// pattern rather than mutating in place. Attenuation levels are bounded to
/// `[`[`ATTEN_ON`]`, `[`ATTEN_OFF`]`]` dB.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelPattern {
    range: ChannelRange,
    port: u8,
    levels: Vec<f64>,
}

impl ChannelPattern {
    /// Create a pattern that assigns the same level to every channel.
    ///
    /// Used for the "all on" baseline (`level = `[`ATTEN_ON`]) and the "all
    /// off" pattern (`level = `[`ATTEN_OFF`]).
    pub fn uniform(range: ChannelRange, level: f64) -> Result<Self, WssError> {
        let level = check_level(level)?;
        Ok(ChannelPattern {
            range,
            port: DEFAULT_PORT,
            levels: vec![level; range.len()],
        })
    }

    /// Create a pattern from one level per channel, in channel order.
    ///
    /// The vector must hold exactly one level for every channel of the range.
    pub fn from_levels(range: ChannelRange, levels: Vec<f64>) -> Result<Self, WssError> {
        if levels.len() != range.len() {
            return Err(WssError::InvalidArgument(format!(
                "Expected {} attenuation levels for channels {}..={}, got {}",
                range.len(),
                range.start(),
                range.end(),
                levels.len()
            )));
        }
        for &level in &levels {
            check_level(level)?;
        }
        Ok(ChannelPattern {
            range,
            port: DEFAULT_PORT,
            levels,
        })
    }

    /// Create a pattern from an explicit channel-to-level mapping.
    ///
    /// The mapping must cover every channel of the range exactly; a missing
    /// channel or a channel outside the range is rejected.
    pub fn from_map(range: ChannelRange, levels: &BTreeMap<u16, f64>) -> Result<Self, WssError> {
        for &channel in levels.keys() {
            range.index_of(channel)?;
        }
        let ordered = range
            .channels()
            .map(|channel| {
                levels
                    .get(&channel)
                    .copied()
                    .ok_or_else(|| WssError::InvalidArgument(format!(
                        "Channel {channel} is missing from the pattern mapping"
                    )))
            })
            .collect::<Result<Vec<f64>, WssError>>()?;
        Self::from_levels(range, ordered)
    }

    /// Create an on/off pattern from one boolean per channel, in channel order.
    ///
    /// `true` turns the channel on ([`ATTEN_ON`]), `false` turns it off
    /// ([`ATTEN_OFF`]). The slice must hold one entry per channel.
    pub fn from_binary(range: ChannelRange, bits: &[bool]) -> Result<Self, WssError> {
        if bits.len() != range.len() {
            return Err(WssError::InvalidArgument(format!(
                "Expected {} binary flags for channels {}..={}, got {}",
                range.len(),
                range.start(),
                range.end(),
                bits.len()
            )));
        }
        let levels = bits
            .iter()
            .map(|&on| if on { ATTEN_ON } else { ATTEN_OFF })
            .collect();
        Self::from_levels(range, levels)
    }

    /// Return a copy of this pattern with a single channel overridden.
    pub fn with_channel(&self, channel: u16, level: f64) -> Result<Self, WssError> {
        let idx = self.range.index_of(channel)?;
        let level = check_level(level)?;
        let mut pattern = self.clone();
        pattern.levels[idx] = level;
        Ok(pattern)
    }

    /// Return a copy of this pattern addressed to a different switch port.
    pub fn with_port(mut self, port: u8) -> Self {
        self.port = port;
        self
    }

    /// The channel range this pattern covers.
    pub fn range(&self) -> ChannelRange {
        self.range
    }

    /// The switch port this pattern is addressed to.
    pub fn port(&self) -> u8 {
        self.port
    }

    /// The attenuation level of one channel.
    pub fn level(&self, channel: u16) -> Result<f64, WssError> {
        Ok(self.levels[self.range.index_of(channel)?])
    }

    /// Iterate over `(channel, level)` pairs in ascending channel order.
    pub fn entries(&self) -> impl Iterator<Item = (u16, f64)> + '_ {
        self.range.channels().zip(self.levels.iter().copied())
    }

    /// All channels whose level is [`ATTEN_ON`].
    pub fn on_channels(&self) -> Vec<u16> {
        self.entries()
            .filter(|&(_, level)| level == ATTEN_ON)
            .map(|(channel, _)| channel)
            .collect()
    }
}

/// All patterns that turn off one contiguous window of `width` channels.
///
/// One pattern per possible window offset, in ascending offset order; the
/// window channels are set to [`ATTEN_OFF`], all others to [`ATTEN_ON`].
/// `width` must lie in `[1, range.len()]`.
pub fn sliding_window_off(
    range: ChannelRange,
    width: usize,
) -> Result<Vec<ChannelPattern>, WssError> {
    if width < 1 || width > range.len() {
        return Err(WssError::InvalidArgument(format!(
            "Window width {width} must lie in [1, {}]",
            range.len()
        )));
    }
    let mut patterns = Vec::with_capacity(range.len() - width + 1);
    for offset in 0..=(range.len() - width) {
        let levels = (0..range.len())
            .map(|i| {
                if i >= offset && i < offset + width {
                    ATTEN_OFF
                } else {
                    ATTEN_ON
                }
            })
            .collect();
        patterns.push(ChannelPattern::from_levels(range, levels)?);
    }
    Ok(patterns)
}

/// The full contiguous-run exclusion set used to characterize crosstalk.
///
/// Concatenates [`sliding_window_off`] for every width from 1 to
/// `range.len()`, in increasing width then increasing offset. For a range of
/// `n` channels this yields `n + (n-1) + ... + 1` patterns, e.g. 666 patterns
/// for channels 52..=87.
pub fn all_sliding_windows(range: ChannelRange) -> Vec<ChannelPattern> {
    let mut patterns = Vec::new();
    for width in 1..=range.len() {
        let mut window =
            sliding_window_off(range, width).expect("Width is validated by the loop bounds");
        patterns.append(&mut window);
    }
    patterns
}

/// A pattern that turns on every `k`-th channel of the range.
///
/// The channel at zero-based range index `i` is on iff `i % k == 0`; all
/// other channels are off. `k` must be at least 1.
pub fn every_k_on(range: ChannelRange, k: usize) -> Result<ChannelPattern, WssError> {
    if k < 1 {
        return Err(WssError::InvalidArgument(format!(
            "Channel step {k} must be at least 1"
        )));
    }
    let levels = (0..range.len())
        .map(|i| if i % k == 0 { ATTEN_ON } else { ATTEN_OFF })
        .collect();
    ChannelPattern::from_levels(range, levels)
}

/// Check an attenuation level against the device's supported span.
fn check_level(level: f64) -> Result<f64, WssError> {
    if !level.is_finite() || level < ATTEN_ON || level > ATTEN_OFF {
        return Err(WssError::AttenuationOutOfRange {
            value: level,
            min: ATTEN_ON,
            max: ATTEN_OFF,
        });
    }
    Ok(level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_rejects_inverted_bounds() {
        assert!(ChannelRange::new(87, 52).is_err());
    }

    #[test]
    fn test_range_len_and_index() {
        let range = ChannelRange::new(52, 87).unwrap();
        assert_eq!(range.len(), 36);
        assert_eq!(range.index_of(52).unwrap(), 0);
        assert_eq!(range.index_of(87).unwrap(), 35);
        assert!(range.index_of(88).is_err());
    }

    #[test]
    fn test_check_level_bounds() {
        assert!(check_level(0.0).is_ok());
        assert!(check_level(99.9).is_ok());
        assert!(check_level(-0.1).is_err());
        assert!(check_level(100.0).is_err());
        assert!(check_level(f64::NAN).is_err());
    }
}
