// Simulated eye tracker
//
// Stands in for the iViewX SDK when no device is attached: scripted
// calibration accuracy, an optional generator thread producing a gaze walk
// with periodic fixations, and direct record injection for tests.

use super::{require_connected, EventHandler, EyeTracker, ReturnCode, SampleHandler};
use crate::error::{BridgeError, Result};
use crate::types::{
    Accuracy, CalibrationSettings, DeviceKind, Endpoints, Eye, EyeData, GazeEvent, GazeSample,
    SystemInfo, Version,
};
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Behavior of a `SimulatedTracker`
#[derive(Debug, Clone)]
pub struct SimulationSettings {
    pub sample_rate: i32,
    /// Accuracy returned by successive validations; the last entry repeats
    pub accuracy_script: Vec<Accuracy>,
    /// Spawn a generator thread once handlers are registered
    pub generate: bool,
    /// Generated samples between two fixation events
    pub fixation_every: u32,
    pub screen_width: f64,
    pub screen_height: f64,
    pub seed: u64,
    /// Fail `connect` with ERR_COULD_NOT_CONNECT
    pub refuse_connection: bool,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            sample_rate: 60,
            accuracy_script: vec![Accuracy {
                deviation_lx: 0.4,
                deviation_ly: 0.5,
                deviation_rx: 0.4,
                deviation_ry: 0.6,
            }],
            generate: true,
            fixation_every: 30,
            screen_width: 1920.0,
            screen_height: 1080.0,
            seed: 0x5eed,
            refuse_connection: false,
        }
    }
}

impl SimulationSettings {
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate <= 0 {
            return Err(BridgeError::InvalidConfig(format!(
                "simulated sample rate must be positive, got {}",
                self.sample_rate
            )));
        }
        if self.screen_width <= 0.0 || self.screen_height <= 0.0 {
            return Err(BridgeError::InvalidConfig(format!(
                "simulated screen must have a positive size, got {}x{}",
                self.screen_width, self.screen_height
            )));
        }
        Ok(())
    }
}

#[derive(Default)]
struct Handlers {
    sample: RwLock<Option<SampleHandler>>,
    event: RwLock<Option<EventHandler>>,
}

impl Handlers {
    fn deliver_sample(&self, sample: &GazeSample) -> bool {
        match self.sample.read().as_ref() {
            Some(handler) => {
                handler(sample);
                true
            }
            None => false,
        }
    }

    fn deliver_event(&self, event: &GazeEvent) -> bool {
        match self.event.read().as_ref() {
            Some(handler) => {
                handler(event);
                true
            }
            None => false,
        }
    }
}

struct Generator {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

pub struct SimulatedTracker {
    settings: SimulationSettings,
    connected: bool,
    handlers: Arc<Handlers>,
    calibrations: Vec<CalibrationSettings>,
    validations: usize,
    logger: Option<(i32, PathBuf)>,
    generator: Option<Generator>,
}

impl SimulatedTracker {
    pub fn new(settings: SimulationSettings) -> Self {
        Self {
            settings,
            connected: false,
            handlers: Arc::new(Handlers::default()),
            calibrations: Vec::new(),
            validations: 0,
            logger: None,
            generator: None,
        }
    }

    /// Deliver a sample to the registered handler. Returns false when none is registered.
    pub fn emit_sample(&self, sample: &GazeSample) -> bool {
        self.handlers.deliver_sample(sample)
    }

    /// Deliver an event to the registered handler. Returns false when none is registered.
    pub fn emit_event(&self, event: &GazeEvent) -> bool {
        self.handlers.deliver_event(event)
    }

    /// Calibration setups received so far, in order
    pub fn calibrations(&self) -> &[CalibrationSettings] {
        &self.calibrations
    }

    pub fn logger(&self) -> Option<(i32, &Path)> {
        self.logger
            .as_ref()
            .map(|(level, path)| (*level, path.as_path()))
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn is_generating(&self) -> bool {
        self.generator.is_some()
    }

    fn maybe_start_generator(&mut self) {
        if !self.settings.generate || !self.connected || self.generator.is_some() {
            return;
        }

        let stop = Arc::new(AtomicBool::new(false));
        let handlers = Arc::clone(&self.handlers);
        let settings = self.settings.clone();
        let thread_stop = Arc::clone(&stop);

        let handle = thread::spawn(move || run_generator(settings, handlers, thread_stop));
        log::debug!(
            "Simulated gaze generator started at {} Hz",
            self.settings.sample_rate
        );
        self.generator = Some(Generator { stop, handle });
    }

    fn stop_generator(&mut self) {
        if let Some(generator) = self.generator.take() {
            generator.stop.store(true, Ordering::Release);
            if generator.handle.join().is_err() {
                log::warn!("Simulated gaze generator panicked");
            }
        }
    }
}

fn run_generator(settings: SimulationSettings, handlers: Arc<Handlers>, stop: Arc<AtomicBool>) {
    let rate = settings.sample_rate.max(1);
    let period = Duration::from_secs_f64(1.0 / f64::from(rate));
    let period_us = period.as_micros() as i64;
    let fixation_every = settings.fixation_every.max(1);

    let mut rng = StdRng::seed_from_u64(settings.seed);
    let start = Instant::now();
    let mut gaze_x = settings.screen_width / 2.0;
    let mut gaze_y = settings.screen_height / 2.0;
    let mut fixation_start_us = 0i64;
    let mut count: u64 = 0;
    let mut next_eye_left = true;

    while !stop.load(Ordering::Acquire) {
        let timestamp_us = start.elapsed().as_micros() as i64;

        gaze_x = (gaze_x + rng.random_range(-4.0..4.0)).clamp(0.0, settings.screen_width);
        gaze_y = (gaze_y + rng.random_range(-4.0..4.0)).clamp(0.0, settings.screen_height);
        let diameter = 3.5 + rng.random_range(-0.2..0.2);

        let eye = |offset: f64| EyeData {
            gaze_x: gaze_x + offset,
            gaze_y,
            diameter,
            position_x: offset * 0.1,
            position_y: 0.0,
            position_z: 600.0,
        };

        let sample = GazeSample {
            timestamp_us,
            left: eye(-1.5),
            right: eye(1.5),
            plane_number: 0,
        };
        handlers.deliver_sample(&sample);

        count += 1;
        if count % u64::from(fixation_every) == 0 {
            let event = GazeEvent {
                event_type: 'F',
                eye: if next_eye_left { Eye::Left } else { Eye::Right },
                start_time_us: fixation_start_us,
                end_time_us: timestamp_us,
                duration_us: timestamp_us - fixation_start_us,
                position_x: gaze_x,
                position_y: gaze_y,
            };
            handlers.deliver_event(&event);
            next_eye_left = !next_eye_left;
            fixation_start_us = timestamp_us + period_us;
        }

        thread::sleep(period);
    }
}

impl EyeTracker for SimulatedTracker {
    fn name(&self) -> &str {
        "simulated"
    }

    fn connect(&mut self, endpoints: &Endpoints) -> Result<()> {
        if self.settings.refuse_connection {
            return Err(BridgeError::Connection(ReturnCode::COULD_NOT_CONNECT));
        }
        log::info!(
            "Simulated tracker connected (send {}:{}, receive {}:{})",
            endpoints.send_ip,
            endpoints.send_port,
            endpoints.receive_ip,
            endpoints.receive_port
        );
        self.connected = true;
        Ok(())
    }

    fn set_logger(&mut self, level: i32, path: &Path) -> Result<()> {
        self.logger = Some((level, path.to_path_buf()));
        Ok(())
    }

    fn system_info(&mut self) -> Result<SystemInfo> {
        require_connected(self.connected, "iV_GetSystemInfo")?;
        Ok(SystemInfo {
            sample_rate: self.settings.sample_rate,
            iview_version: Version::default(),
            api_version: Version::default(),
            device: DeviceKind::Custom,
        })
    }

    fn setup_calibration(&mut self, settings: &CalibrationSettings) -> Result<()> {
        require_connected(self.connected, "iV_SetupCalibration")?;
        self.calibrations.push(settings.clone());
        Ok(())
    }

    fn calibrate(&mut self) -> Result<()> {
        require_connected(self.connected, "iV_Calibrate")
    }

    fn validate(&mut self) -> Result<()> {
        require_connected(self.connected, "iV_Validate")?;
        self.validations += 1;
        Ok(())
    }

    fn accuracy(&mut self) -> Result<Accuracy> {
        require_connected(self.connected, "iV_GetAccuracy")?;
        if self.validations == 0 {
            return Err(BridgeError::Sdk {
                call: "iV_GetAccuracy",
                code: ReturnCode::NOT_VALIDATED,
            });
        }
        let script = &self.settings.accuracy_script;
        let index = (self.validations - 1).min(script.len().saturating_sub(1));
        Ok(script.get(index).copied().unwrap_or_default())
    }

    fn set_sample_handler(&mut self, handler: Option<SampleHandler>) -> Result<()> {
        let install = handler.is_some();
        *self.handlers.sample.write() = handler;
        if install {
            self.maybe_start_generator();
        }
        Ok(())
    }

    fn set_event_handler(&mut self, handler: Option<EventHandler>) -> Result<()> {
        let install = handler.is_some();
        *self.handlers.event.write() = handler;
        if install {
            self.maybe_start_generator();
        }
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        self.stop_generator();
        self.connected = false;
        Ok(())
    }
}

impl Drop for SimulatedTracker {
    fn drop(&mut self) {
        self.stop_generator();
    }
}
