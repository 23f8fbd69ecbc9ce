//! Tests for the sweep executor, driven through the loopback interface.
//!
//! The loopback interface asserts the exact command traffic of each sweep,
//! including the baseline restorations before the first pattern and after the
//! last one.

use std::time::Duration;

use rstest::*;

use seriallink::LoopbackInterface;

use optowave_wss100::{
    AcquisitionBlock, AcquisitionRecord, AcquisitionSettings, AcquisitionSource, ChannelRange,
    ResultRecorder, SampleStore, StepOutcome, SweepExecutor, SweepPlan, Wss100, WssError,
    pattern::sliding_window_off,
};

const TERM: &str = "\r\n";

const BASELINE: &str = "URA 52,3,0.0;53,3,0.0;54,3,0.0";
const WINDOW_52: &str = "URA 52,3,99.9;53,3,0.0;54,3,0.0";
const WINDOW_53: &str = "URA 52,3,0.0;53,3,99.9;54,3,0.0";
const WINDOW_54: &str = "URA 52,3,0.0;53,3,0.0;54,3,99.9";

/// An acquisition source producing a deterministic voltage ramp.
#[derive(Default)]
struct RampSource {
    acquisitions: usize,
}

impl AcquisitionSource for RampSource {
    fn acquire(&mut self, settings: &AcquisitionSettings) -> Result<AcquisitionBlock, WssError> {
        self.acquisitions += 1;
        let samples = (0..settings.sample_count()).map(|i| i as f64 * 1e-3).collect();
        Ok(AcquisitionBlock::from_samples(settings, samples))
    }
}

/// A store keeping records in memory for inspection.
#[derive(Default)]
struct MemoryStore {
    records: Vec<(usize, AcquisitionRecord)>,
}

impl SampleStore for MemoryStore {
    fn store(&mut self, index: usize, record: &AcquisitionRecord) -> Result<(), WssError> {
        self.records.push((index, record.clone()));
        Ok(())
    }
}

#[fixture]
fn range() -> ChannelRange {
    ChannelRange::new(52, 54).unwrap()
}

/// Settings small enough that each acquisition is a handful of samples.
#[fixture]
fn settings() -> AcquisitionSettings {
    AcquisitionSettings {
        sample_rate_hz: 10.0,
        duration: Duration::from_millis(500),
    }
}

/// The device read-back confirming a pattern-set command.
fn rb(cmd: &str) -> String {
    cmd.replacen("URA", "RRA", 1)
}

/// Script one successful apply cycle: set, commit, read back.
fn apply_ok(host2inst: &mut Vec<String>, inst2host: &mut Vec<String>, cmd: &str) {
    apply_with_readback(host2inst, inst2host, cmd, &rb(cmd));
}

/// Script an apply cycle that reports a different pattern on read-back.
fn apply_with_readback(
    host2inst: &mut Vec<String>,
    inst2host: &mut Vec<String>,
    cmd: &str,
    readback: &str,
) {
    host2inst.extend([cmd.to_string(), "RSW".to_string(), "RRA?".to_string()]);
    inst2host.extend([
        cmd.to_string(),
        "OK".to_string(),
        "RSW".to_string(),
        "OK".to_string(),
        readback.to_string(),
        "OK".to_string(),
    ]);
}

/// Script an apply cycle that dies on the pattern-set command.
fn apply_fails(host2inst: &mut Vec<String>, inst2host: &mut Vec<String>, cmd: &str) {
    host2inst.push(cmd.to_string());
    inst2host.extend([cmd.to_string(), "ERR -101".to_string()]);
}

fn crt_executor(
    host2inst: Vec<String>,
    inst2host: Vec<String>,
    settings: AcquisitionSettings,
) -> SweepExecutor<LoopbackInterface, RampSource> {
    let interface = LoopbackInterface::new(host2inst, inst2host, TERM);
    let wss = Wss100::try_new(interface).unwrap();
    SweepExecutor::new(wss, RampSource::default(), settings)
}

/// A plan of the three single-channel exclusion windows, zero settle.
fn window_plan(range: ChannelRange) -> SweepPlan {
    SweepPlan::from_patterns(sliding_window_off(range, 1).unwrap(), Duration::ZERO)
}

/// A full sweep records every pattern and brackets the run with baselines.
#[rstest]
fn test_full_sweep(range: ChannelRange, settings: AcquisitionSettings) {
    let mut host2inst = vec![];
    let mut inst2host = vec![];
    apply_ok(&mut host2inst, &mut inst2host, BASELINE);
    for cmd in [WINDOW_52, WINDOW_53, WINDOW_54] {
        apply_ok(&mut host2inst, &mut inst2host, cmd);
    }
    apply_ok(&mut host2inst, &mut inst2host, BASELINE);

    let mut exec = crt_executor(host2inst, inst2host, settings);
    let mut recorder = ResultRecorder::new(MemoryStore::default());
    let report = exec.run(&window_plan(range), &mut recorder).unwrap();

    assert!(!report.cancelled);
    assert_eq!(report.recorded(), 3);
    assert_eq!(report.abandoned(), 0);

    let store = recorder.into_store();
    assert_eq!(store.records.len(), 3);
    let (index, record) = &store.records[1];
    assert_eq!(*index, 1);
    assert_eq!(record.command, WINDOW_53);
    assert!(record.verified);
    assert_eq!(record.block.samples.len(), 5);
    assert_eq!(record.block.timestamps[0], 0.0);
}

/// A protocol failure on the middle pattern abandons only that step; the
/// remaining patterns are still measured and the baseline is restored.
#[rstest]
fn test_abandoned_step_continues_plan(range: ChannelRange, settings: AcquisitionSettings) {
    let mut host2inst = vec![];
    let mut inst2host = vec![];
    apply_ok(&mut host2inst, &mut inst2host, BASELINE);
    apply_ok(&mut host2inst, &mut inst2host, WINDOW_52);
    apply_fails(&mut host2inst, &mut inst2host, WINDOW_53);
    apply_ok(&mut host2inst, &mut inst2host, WINDOW_54);
    apply_ok(&mut host2inst, &mut inst2host, BASELINE);

    let mut exec = crt_executor(host2inst, inst2host, settings);
    let mut recorder = ResultRecorder::new(MemoryStore::default());
    let report = exec.run(&window_plan(range), &mut recorder).unwrap();

    assert_eq!(report.recorded(), 2);
    assert_eq!(report.abandoned(), 1);
    match &report.outcomes[1] {
        StepOutcome::Abandoned {
            step,
            command,
            error,
        } => {
            assert_eq!(*step, 1);
            assert_eq!(command, WINDOW_53);
            assert!(matches!(error, WssError::Protocol { .. }));
        }
        _ => panic!("Expected step 1 to be abandoned"),
    }

    // Indices never skip: the abandoned step does not consume one.
    let store = recorder.into_store();
    assert_eq!(store.records[0].0, 0);
    assert_eq!(store.records[0].1.command, WINDOW_52);
    assert_eq!(store.records[1].0, 1);
    assert_eq!(store.records[1].1.command, WINDOW_54);
}

/// A read-back that disagrees with the pattern still yields a measurement,
/// flagged as unverified.
#[rstest]
fn test_mismatched_readback_flags_record(range: ChannelRange, settings: AcquisitionSettings) {
    let mut host2inst = vec![];
    let mut inst2host = vec![];
    apply_ok(&mut host2inst, &mut inst2host, BASELINE);
    // Device reports channel 52 still on although the pattern turns it off.
    apply_with_readback(
        &mut host2inst,
        &mut inst2host,
        WINDOW_52,
        "RRA 52,3,0.0;53,3,0.0;54,3,0.0",
    );
    apply_ok(&mut host2inst, &mut inst2host, BASELINE);

    let plan = SweepPlan::from_patterns(
        vec![sliding_window_off(range, 1).unwrap().remove(0)],
        Duration::ZERO,
    );
    let mut exec = crt_executor(host2inst, inst2host, settings);
    let mut recorder = ResultRecorder::new(MemoryStore::default());
    let report = exec.run(&plan, &mut recorder).unwrap();

    assert_eq!(report.recorded(), 1);
    match &report.outcomes[0] {
        StepOutcome::Recorded { verified, .. } => assert!(!verified),
        _ => panic!("Expected a recorded outcome"),
    }
    assert!(!recorder.into_store().records[0].1.verified);
}

/// A cancelled sweep stops at the next transition and restores the baseline.
#[rstest]
fn test_cancelled_before_first_step(range: ChannelRange, settings: AcquisitionSettings) {
    let mut host2inst = vec![];
    let mut inst2host = vec![];
    apply_ok(&mut host2inst, &mut inst2host, BASELINE);
    apply_ok(&mut host2inst, &mut inst2host, BASELINE);

    let mut exec = crt_executor(host2inst, inst2host, settings);
    exec.cancel_token().cancel();
    let mut recorder = ResultRecorder::new(MemoryStore::default());
    let report = exec.run(&window_plan(range), &mut recorder).unwrap();

    assert!(report.cancelled);
    assert!(report.outcomes.is_empty());
    assert_eq!(recorder.stored(), 0);
}

/// An empty plan is rejected before anything is sent to the device.
#[rstest]
fn test_empty_plan_rejected(settings: AcquisitionSettings) {
    let mut exec = crt_executor(vec![], vec![], settings);
    let mut recorder = ResultRecorder::new(MemoryStore::default());
    let plan = SweepPlan::new(Duration::ZERO);
    assert!(matches!(
        exec.run(&plan, &mut recorder),
        Err(WssError::InvalidArgument(_))
    ));
}

/// Patterns over different universes cannot share one plan.
#[rstest]
fn test_mixed_universe_plan_rejected(range: ChannelRange, settings: AcquisitionSettings) {
    let other = ChannelRange::new(60, 70).unwrap();
    let mut patterns = sliding_window_off(range, 1).unwrap();
    patterns.extend(sliding_window_off(other, 1).unwrap());
    let plan = SweepPlan::from_patterns(patterns, Duration::ZERO);

    let mut exec = crt_executor(vec![], vec![], settings);
    let mut recorder = ResultRecorder::new(MemoryStore::default());
    assert!(matches!(
        exec.run(&plan, &mut recorder),
        Err(WssError::InvalidArgument(_))
    ));
}
