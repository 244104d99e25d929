// Interactive calibration loop
//
// Repeats setup -> calibrate -> validate -> accuracy until every deviation is
// within the threshold or the operator skips. SDK failures of individual steps
// are reported and the round carries on; the accuracy check decides.

use crate::error::{BridgeError, Result};
use crate::sdk::EyeTracker;
use crate::types::{Accuracy, CalibrationSettings};
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, Write};

/// Default maximum accepted deviation, in degrees
pub const DEFAULT_MIN_ACCURACY: f64 = 1.0;

/// Operator decision after a round that missed the threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationChoice {
    RepeatAuto,
    RepeatManual,
    Skip,
}

impl CalibrationChoice {
    /// Interpret a console answer. `s` anywhere skips, otherwise `m` anywhere
    /// selects manual control; anything else repeats automatically.
    pub fn parse(input: &str) -> Self {
        if input.contains('s') {
            CalibrationChoice::Skip
        } else if input.contains('m') {
            CalibrationChoice::RepeatManual
        } else {
            CalibrationChoice::RepeatAuto
        }
    }
}

/// Operator interaction during calibration
pub trait CalibrationPrompt {
    /// Called after every round that produced an accuracy reading
    fn report(&mut self, _round: usize, _accuracy: &Accuracy) -> Result<()> {
        Ok(())
    }

    /// Ask how to continue after a round that missed `threshold`
    fn choose(&mut self, accuracy: Option<&Accuracy>, threshold: f64) -> Result<CalibrationChoice>;
}

/// Line-based prompt over any reader/writer pair
pub struct ConsolePrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> ConsolePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl ConsolePrompt<io::StdinLock<'static>, io::Stderr> {
    /// Prompt on stderr, answers from stdin
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> CalibrationPrompt for ConsolePrompt<R, W> {
    fn report(&mut self, round: usize, accuracy: &Accuracy) -> Result<()> {
        writeln!(self.output, "Calibration round {}", round)?;
        writeln!(
            self.output,
            "deviationXLeft {} deviationYLeft {}",
            accuracy.deviation_lx, accuracy.deviation_ly
        )?;
        writeln!(
            self.output,
            "deviationXRight {} deviationYRight {}",
            accuracy.deviation_rx, accuracy.deviation_ry
        )?;
        Ok(())
    }

    fn choose(&mut self, accuracy: Option<&Accuracy>, threshold: f64) -> Result<CalibrationChoice> {
        match accuracy {
            Some(_) => writeln!(self.output, "One or more accuracies were above {}", threshold)?,
            None => writeln!(self.output, "Accuracy could not be determined")?,
        }
        write!(
            self.output,
            "Just press enter to repeat auto calibration, 'm' (+ Enter) to repeat calibration \
             under manual control or 's' (+ Enter) to skip further calibration >"
        )?;
        self.output.flush()?;

        let mut line = Vec::new();
        if self.input.read_until(b'\n', &mut line)? == 0 {
            writeln!(self.output)?;
            log::info!("Input closed, skipping further calibration");
            return Ok(CalibrationChoice::Skip);
        }
        let answer = String::from_utf8_lossy(&line);
        Ok(CalibrationChoice::parse(answer.trim_end_matches(['\r', '\n'])))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Largest deviation accepted on any axis
    pub min_accuracy: f64,
    /// Stop after this many rounds (at least one runs); unlimited when `None`
    pub max_rounds: Option<usize>,
    pub settings: CalibrationSettings,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            min_accuracy: DEFAULT_MIN_ACCURACY,
            max_rounds: None,
            settings: CalibrationSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationOutcome {
    pub rounds: usize,
    /// Last accuracy reading, if any round produced one
    pub accuracy: Option<Accuracy>,
    /// True when the last reading met the threshold
    pub accepted: bool,
}

/// Log a calibration step; SDK return codes are not fatal here.
fn step(call: &str, result: Result<()>) -> Result<()> {
    match result {
        Ok(()) => {
            log::info!("{}: success", call);
            Ok(())
        }
        Err(BridgeError::Sdk { code, .. }) => {
            log::warn!("{}: {}", call, code);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Run the calibration loop until accepted, skipped, or out of rounds.
pub fn run_calibration<T, P>(
    tracker: &mut T,
    config: &CalibrationConfig,
    prompt: &mut P,
) -> Result<CalibrationOutcome>
where
    T: EyeTracker + ?Sized,
    P: CalibrationPrompt + ?Sized,
{
    if config.min_accuracy.is_nan() || config.min_accuracy < 0.0 {
        return Err(BridgeError::InvalidConfig(format!(
            "min_accuracy must be a non-negative number, got {}",
            config.min_accuracy
        )));
    }

    let threshold = config.min_accuracy;
    let mut manual = !config.settings.auto_accept;
    let mut outcome = CalibrationOutcome {
        rounds: 0,
        accuracy: None,
        accepted: false,
    };

    loop {
        outcome.rounds += 1;

        let settings = CalibrationSettings {
            auto_accept: !manual,
            ..config.settings.clone()
        };
        log::info!(
            "Calibration round {} ({} control)",
            outcome.rounds,
            if manual { "manual" } else { "automatic" }
        );

        step("iV_SetupCalibration", tracker.setup_calibration(&settings))?;
        step("iV_Calibrate", tracker.calibrate())?;
        step("iV_Validate", tracker.validate())?;

        outcome.accuracy = match tracker.accuracy() {
            Ok(accuracy) => {
                log::info!(
                    "iV_GetAccuracy: left ({}, {}), right ({}, {})",
                    accuracy.deviation_lx,
                    accuracy.deviation_ly,
                    accuracy.deviation_rx,
                    accuracy.deviation_ry
                );
                prompt.report(outcome.rounds, &accuracy)?;
                Some(accuracy)
            }
            Err(BridgeError::Sdk { code, .. }) => {
                log::warn!("iV_GetAccuracy: {}", code);
                None
            }
            Err(e) => return Err(e),
        };

        if let Some(accuracy) = outcome.accuracy {
            if accuracy.within(threshold) {
                outcome.accepted = true;
                break;
            }
        }

        if config.max_rounds.is_some_and(|max| outcome.rounds >= max) {
            log::warn!(
                "Calibration stopped after {} rounds without reaching {}",
                outcome.rounds,
                threshold
            );
            break;
        }

        match prompt.choose(outcome.accuracy.as_ref(), threshold)? {
            CalibrationChoice::Skip => {
                log::info!("Operator skipped further calibration");
                break;
            }
            CalibrationChoice::RepeatManual => manual = true,
            CalibrationChoice::RepeatAuto => manual = false,
        }
    }

    Ok(outcome)
}
