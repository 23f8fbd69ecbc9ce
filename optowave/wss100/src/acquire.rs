//! The acquisition seam between the sweep executor and the analog front end.

use std::time::Duration;

use crate::WssError;

/// Sample rate and acquisition window for one measurement.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AcquisitionSettings {
    /// Sample rate in Hz.
    pub sample_rate_hz: f64,
    /// Length of the acquisition window.
    pub duration: Duration,
}

impl AcquisitionSettings {
    /// Number of samples one acquisition with these settings produces.
    pub fn sample_count(&self) -> usize {
        (self.sample_rate_hz * self.duration.as_secs_f64()) as usize
    }
}

impl Default for AcquisitionSettings {
    /// 1 kHz for 2 seconds, the window the crosstalk sweeps were run with.
    fn default() -> Self {
        AcquisitionSettings {
            sample_rate_hz: 1e3,
            duration: Duration::from_secs(2),
        }
    }
}

/// One block of timestamped voltage samples.
#[derive(Clone, Debug, PartialEq)]
pub struct AcquisitionBlock {
    /// Elapsed time of each sample, in seconds, starting at 0.
    pub timestamps: Vec<f64>,
    /// The voltage samples, one per timestamp.
    pub samples: Vec<f64>,
}

impl AcquisitionBlock {
    /// Build a block from raw samples, deriving evenly spaced timestamps.
    ///
    /// Timestamps start at 0 and are spaced `duration / sample count` apart,
    /// matching how the analog front end clocks its conversions.
    pub fn from_samples(settings: &AcquisitionSettings, samples: Vec<f64>) -> Self {
        let spacing = settings.duration.as_secs_f64() / samples.len().max(1) as f64;
        let timestamps = (0..samples.len()).map(|i| spacing * i as f64).collect();
        AcquisitionBlock {
            timestamps,
            samples,
        }
    }

    /// Number of samples in the block.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the block holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// A source of voltage acquisitions, e.g., a DAQ analog input channel.
///
/// Implementations block until the full acquisition window has been captured.
/// The device identifier and channel selection are configuration of the
/// concrete source.
pub trait AcquisitionSource {
    /// Capture one block of samples with the given settings.
    fn acquire(&mut self, settings: &AcquisitionSettings) -> Result<AcquisitionBlock, WssError>;
}
