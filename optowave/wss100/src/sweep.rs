//! Sweep execution: apply a plan of patterns, settle, measure, record.
//!
//! The executor drives one [`SweepPlan`] to completion over an exclusively
//! owned device session and acquisition source. Each step walks through the
//! same cycle: configure and commit the pattern on the switch, verify the
//! read-back, wait for the switch to settle, capture one acquisition block,
//! and hand the block to the recorder. The device protocol is half-duplex, so
//! steps run strictly in sequence; only one pattern can be physically active
//! at a time.
//!
//! A protocol or transport failure while configuring a pattern abandons that
//! step (it is reported, no measurement is taken) and the sweep advances, so
//! a flaky link still yields a usable partial dataset. Before the first step
//! and after the last one (also after a cancellation) the executor drives the
//! switch back to the all-on baseline so the hardware is never left in a
//! sweep-internal state.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use seriallink::InstrumentInterface;

use crate::{
    ATTEN_ON, ChannelPattern, ChannelRange, Wss100, WssError,
    acquire::{AcquisitionSettings, AcquisitionSource},
    encode_pattern, readback_matches,
    record::{AcquisitionRecord, ResultRecorder, SampleStore},
};

/// One step of a sweep plan: a pattern and an optional settle override.
#[derive(Clone, Debug, PartialEq)]
pub struct SweepStep {
    /// The pattern to apply.
    pub pattern: ChannelPattern,
    /// Settle time before measuring; `None` uses the plan default.
    pub settle: Option<Duration>,
}

/// An ordered sequence of patterns to apply and measure.
#[derive(Clone, Debug, PartialEq)]
pub struct SweepPlan {
    steps: Vec<SweepStep>,
    default_settle: Duration,
}

impl SweepPlan {
    /// Create an empty plan with a plan-wide default settle time.
    ///
    /// The settle time is a physical requirement of the switch: after a
    /// commit, the optical path needs time to stabilize before a measurement
    /// is valid. Tests may set it to zero.
    pub fn new(default_settle: Duration) -> Self {
        SweepPlan {
            steps: Vec::new(),
            default_settle,
        }
    }

    /// Create a plan from a list of patterns, all using the default settle.
    pub fn from_patterns(patterns: Vec<ChannelPattern>, default_settle: Duration) -> Self {
        let mut plan = Self::new(default_settle);
        for pattern in patterns {
            plan.push(pattern);
        }
        plan
    }

    /// Append a pattern using the plan-wide settle time.
    pub fn push(&mut self, pattern: ChannelPattern) {
        self.steps.push(SweepStep {
            pattern,
            settle: None,
        });
    }

    /// Append a pattern with its own settle time.
    pub fn push_with_settle(&mut self, pattern: ChannelPattern, settle: Duration) {
        self.steps.push(SweepStep {
            pattern,
            settle: Some(settle),
        });
    }

    /// The steps of the plan, in execution order.
    pub fn steps(&self) -> &[SweepStep] {
        &self.steps
    }

    /// Number of steps in the plan.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the plan holds no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The settle time of a step, falling back to the plan default.
    fn settle_for(&self, step: &SweepStep) -> Duration {
        step.settle.unwrap_or(self.default_settle)
    }

    /// The channel universe and port shared by all steps.
    ///
    /// Fails if the plan is empty or its steps disagree on range or port; a
    /// sweep is defined over one fixed channel universe.
    fn universe(&self) -> Result<(ChannelRange, u8), WssError> {
        let first = self.steps.first().ok_or_else(|| {
            WssError::InvalidArgument("A sweep plan must hold at least one pattern".to_string())
        })?;
        let range = first.pattern.range();
        let port = first.pattern.port();
        for step in &self.steps {
            if step.pattern.range() != range || step.pattern.port() != port {
                return Err(WssError::InvalidArgument(
                    "All patterns of a sweep plan must share one channel range and port"
                        .to_string(),
                ));
            }
        }
        Ok((range, port))
    }
}

/// Cooperative cancellation handle for a running sweep.
///
/// Cancellation is honored at state transitions only, never in the middle of
/// a transport call; the executor restores the all-on baseline before it
/// returns.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a new, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the sweep holding the paired token.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome of one sweep step.
#[derive(Debug)]
pub enum StepOutcome {
    /// The step was measured and stored under the given sequence index.
    Recorded {
        /// Zero-based position of the step in the plan.
        step: usize,
        /// Sequence index the record was stored under.
        index: usize,
        /// Whether the device read-back confirmed the pattern.
        verified: bool,
    },
    /// The step was abandoned without a measurement.
    Abandoned {
        /// Zero-based position of the step in the plan.
        step: usize,
        /// The pattern-set command that failed.
        command: String,
        /// The error that caused the abandonment.
        error: WssError,
    },
}

/// What a sweep run did, step by step.
#[derive(Debug, Default)]
pub struct SweepReport {
    /// Per-step outcomes in plan order; cancelled steps do not appear.
    pub outcomes: Vec<StepOutcome>,
    /// Whether the sweep stopped early due to cancellation.
    pub cancelled: bool,
}

impl SweepReport {
    /// Number of steps that produced a stored record.
    pub fn recorded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, StepOutcome::Recorded { .. }))
            .count()
    }

    /// Number of steps that were abandoned.
    pub fn abandoned(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, StepOutcome::Abandoned { .. }))
            .count()
    }
}

/// Drives sweep plans over a device session and an acquisition source.
///
/// The executor owns both collaborators exclusively for the lifetime of the
/// sweep; no other code may talk to the device while a sweep runs.
pub struct SweepExecutor<T: InstrumentInterface, A: AcquisitionSource> {
    wss: Wss100<T>,
    source: A,
    settings: AcquisitionSettings,
    cancel: CancelToken,
}

impl<T: InstrumentInterface, A: AcquisitionSource> SweepExecutor<T, A> {
    /// Create an executor over a device session and an acquisition source.
    pub fn new(wss: Wss100<T>, source: A, settings: AcquisitionSettings) -> Self {
        SweepExecutor {
            wss,
            source,
            settings,
            cancel: CancelToken::new(),
        }
    }

    /// A handle that cancels the running sweep at its next state transition.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Give the device session and acquisition source back.
    pub fn into_parts(self) -> (Wss100<T>, A) {
        (self.wss, self.source)
    }

    /// Run one sweep plan to completion.
    ///
    /// Per-step protocol and transport failures are degraded to abandonments
    /// and the plan continues. Errors outside a step's configure/commit cycle
    /// (baseline restoration, acquisition, persistence) are fatal and abort
    /// the run.
    pub fn run<S: SampleStore>(
        &mut self,
        plan: &SweepPlan,
        recorder: &mut ResultRecorder<S>,
    ) -> Result<SweepReport, WssError> {
        let (range, port) = plan.universe()?;
        let baseline = ChannelPattern::uniform(range, ATTEN_ON)?.with_port(port);
        let mut report = SweepReport::default();

        log::info!(
            "Starting sweep: {} patterns over channels {}..={}",
            plan.len(),
            range.start(),
            range.end()
        );
        self.restore_baseline(&baseline)?;

        for (step_idx, step) in plan.steps().iter().enumerate() {
            if self.cancelled(&mut report) {
                break;
            }

            // Configuring, Committing, Verifying.
            let command = encode_pattern(&step.pattern);
            let readback = match self.wss.apply_pattern(&step.pattern) {
                Ok(readback) => readback,
                Err(error @ (WssError::Protocol { .. } | WssError::Transport(_))) => {
                    log::warn!("Abandoning pattern {step_idx} ('{command}'): {error}");
                    report.outcomes.push(StepOutcome::Abandoned {
                        step: step_idx,
                        command,
                        error,
                    });
                    continue;
                }
                Err(error) => return Err(error),
            };
            let verified = readback_matches(&step.pattern, &readback);
            if !verified {
                let mismatch = WssError::VerificationMismatch {
                    command: command.clone(),
                    readback,
                };
                log::warn!("Pattern {step_idx} read-back disagrees, continuing: {mismatch}");
            }

            // Settling.
            if self.cancelled(&mut report) {
                break;
            }
            thread::sleep(plan.settle_for(step));

            // Acquiring.
            if self.cancelled(&mut report) {
                break;
            }
            let block = self.source.acquire(&self.settings)?;

            // Recording.
            let record = AcquisitionRecord {
                block,
                command,
                verified,
            };
            let index = recorder.record(&record)?;
            log::info!("Pattern {step_idx} recorded as index {index} (verified: {verified})");
            report.outcomes.push(StepOutcome::Recorded {
                step: step_idx,
                index,
                verified,
            });
        }

        self.restore_baseline(&baseline)?;
        Ok(report)
    }

    /// Check for cancellation at a state transition.
    fn cancelled(&self, report: &mut SweepReport) -> bool {
        if self.cancel.is_cancelled() {
            log::info!("Sweep cancelled, restoring baseline");
            report.cancelled = true;
            true
        } else {
            false
        }
    }

    /// Drive the switch to the all-on baseline pattern.
    ///
    /// A read-back mismatch here is only logged: the baseline is a safety
    /// measure, not a measurement.
    fn restore_baseline(&mut self, baseline: &ChannelPattern) -> Result<(), WssError> {
        let readback = self.wss.apply_pattern(baseline)?;
        if !readback_matches(baseline, &readback) {
            log::warn!("Baseline read-back disagrees: {readback}");
        }
        Ok(())
    }
}
