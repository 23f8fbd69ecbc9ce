//! Run the full contiguous-window crosstalk sweep against real hardware.
//!
//! The switch is expected on a serial port; the acquisition source here is a
//! stand-in that synthesizes a ramp, replace it with your DAQ frontend.

use std::time::Duration;

use optowave_wss100::{
    AcquisitionBlock, AcquisitionSettings, AcquisitionSource, ChannelRange, HandshakeConfig,
    ResultRecorder, SerialInterfaceWss, SweepExecutor, SweepPlan, TextFileStore, Wss100, WssError,
    handshake,
    pattern::all_sliding_windows,
};

/// A stand-in acquisition source that synthesizes a voltage ramp.
struct RampSource;

impl AcquisitionSource for RampSource {
    fn acquire(&mut self, settings: &AcquisitionSettings) -> Result<AcquisitionBlock, WssError> {
        let samples = (0..settings.sample_count()).map(|i| i as f64 * 1e-3).collect();
        Ok(AcquisitionBlock::from_samples(settings, samples))
    }
}

fn main() {
    env_logger::init();

    let port = "/dev/ttyUSB0";

    // Get our serial instrument interface and open the switch with it.
    let serial_inst = SerialInterfaceWss::simple(port).expect("Failed to open serial port");
    let mut wss = Wss100::try_new(serial_inst).unwrap();

    // Verify the instrument identity before applying anything.
    let identity = handshake::establish(&mut wss, &HandshakeConfig::default()).unwrap();
    println!("Instrument ID: {identity}");
    println!("Serial number: {}", wss.serial_number().unwrap());
    println!("Manufacture date: {}", wss.manufacture_date().unwrap());

    // The full exclusion-window set over the characterized channel range,
    // with three seconds of settle time after each commit.
    let range = ChannelRange::new(52, 87).unwrap();
    let plan = SweepPlan::from_patterns(all_sliding_windows(range), Duration::from_secs(3));
    println!("Sweeping {} patterns", plan.len());

    let mut exec = SweepExecutor::new(wss, RampSource, AcquisitionSettings::default());
    let mut recorder = ResultRecorder::new(TextFileStore::new("off_channels"));
    let report = exec.run(&plan, &mut recorder).unwrap();

    println!(
        "Sweep finished: {} recorded, {} abandoned",
        report.recorded(),
        report.abandoned()
    );
}
