// Tracker -> outlet bridge
//
// Lifecycle: connect (device + outlets) -> calibrate -> start_streaming ->
// shutdown. Handlers run on the SDK's delivery thread and only map and push;
// push failures are counted, never reported back into the SDK.

use crate::calibration::{run_calibration, CalibrationOutcome, CalibrationPrompt};
use crate::config::BridgeConfig;
use crate::error::Result;
use crate::mapping::{event_channels, gaze_channels, reference_millis_now};
use crate::outlet::{OutletFactory, SampleOutlet};
use crate::sdk::EyeTracker;
use crate::streams::{event_stream, gaze_stream};
use crate::types::{GazeEvent, GazeSample, SystemInfo};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters shared with the SDK callbacks
#[derive(Debug, Default)]
pub struct ForwardStats {
    samples: AtomicU64,
    events: AtomicU64,
    failed_pushes: AtomicU64,
}

impl ForwardStats {
    fn record(&self, counter: &AtomicU64, outlet: &dyn SampleOutlet, values: &[f32]) {
        match outlet.push(values) {
            Ok(()) => {
                counter.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                let previous = self.failed_pushes.fetch_add(1, Ordering::Relaxed);
                if previous == 0 {
                    log::warn!(
                        "Push to '{}' failed: {} (further failures logged at debug level)",
                        outlet.stream_name(),
                        e
                    );
                } else {
                    log::debug!("Push to '{}' failed: {}", outlet.stream_name(), e);
                }
            }
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            samples_forwarded: self.samples.load(Ordering::Relaxed),
            events_forwarded: self.events.load(Ordering::Relaxed),
            failed_pushes: self.failed_pushes.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of `ForwardStats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub samples_forwarded: u64,
    pub events_forwarded: u64,
    pub failed_pushes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Connected,
    Streaming,
    Closed,
}

pub struct Bridge<T: EyeTracker> {
    tracker: T,
    config: BridgeConfig,
    system: SystemInfo,
    gaze_outlet: Arc<dyn SampleOutlet>,
    event_outlet: Arc<dyn SampleOutlet>,
    stats: Arc<ForwardStats>,
    state: BridgeState,
}

impl<T: EyeTracker> Bridge<T> {
    /// Connect to the tracker, configure its logger, read system info and
    /// open both outlets at the tracker's sample rate.
    ///
    /// The tracker is disconnected again if any step after `connect` fails.
    pub fn connect<F>(mut tracker: T, factory: &F, config: BridgeConfig) -> Result<Self>
    where
        F: OutletFactory + ?Sized,
    {
        config.validate()?;
        tracker.connect(&config.endpoints)?;
        log::info!("Connected to {} tracker", tracker.name());

        match Self::prepare(&mut tracker, factory, &config) {
            Ok((system, gaze_outlet, event_outlet)) => Ok(Self {
                tracker,
                config,
                system,
                gaze_outlet,
                event_outlet,
                stats: Arc::new(ForwardStats::default()),
                state: BridgeState::Connected,
            }),
            Err(e) => {
                if let Err(disconnect_err) = tracker.disconnect() {
                    log::warn!("Disconnect after failed setup also failed: {}", disconnect_err);
                }
                Err(e)
            }
        }
    }

    #[allow(clippy::type_complexity)]
    fn prepare<F>(
        tracker: &mut T,
        factory: &F,
        config: &BridgeConfig,
    ) -> Result<(SystemInfo, Arc<dyn SampleOutlet>, Arc<dyn SampleOutlet>)>
    where
        F: OutletFactory + ?Sized,
    {
        if let Err(e) = tracker.set_logger(config.sdk_log_level, &config.sdk_log_file) {
            log::warn!(
                "iV_SetLogger({}, {}): {}",
                config.sdk_log_level,
                config.sdk_log_file.display(),
                e
            );
        }

        let system = tracker.system_info()?;
        log::info!(
            "System info: {} Hz, iViewX {}, API {}, device {:?}",
            system.sample_rate,
            system.iview_version,
            system.api_version,
            system.device
        );

        let rate = system.nominal_rate();
        let gaze: Arc<dyn SampleOutlet> =
            Arc::from(factory.open(&gaze_stream(rate, config.outlet, &config.metadata))?);
        let events: Arc<dyn SampleOutlet> =
            Arc::from(factory.open(&event_stream(rate, config.outlet, &config.metadata))?);

        Ok((system, gaze, events))
    }

    /// Run the interactive calibration loop.
    pub fn calibrate<P>(&mut self, prompt: &mut P) -> Result<CalibrationOutcome>
    where
        P: CalibrationPrompt + ?Sized,
    {
        let outcome = run_calibration(&mut self.tracker, &self.config.calibration, prompt)?;
        if outcome.accepted {
            log::info!("Calibration accepted after {} round(s)", outcome.rounds);
        } else {
            log::warn!(
                "Streaming with calibration above {} after {} round(s)",
                self.config.calibration.min_accuracy,
                outcome.rounds
            );
        }
        Ok(outcome)
    }

    /// Register the sample and event handlers.
    pub fn start_streaming(&mut self) -> Result<()> {
        if self.state == BridgeState::Streaming {
            return Ok(());
        }

        let outlet = Arc::clone(&self.gaze_outlet);
        let stats = Arc::clone(&self.stats);
        self.tracker.set_sample_handler(Some(Box::new(move |sample: &GazeSample| {
            let values = gaze_channels(sample);
            stats.record(&stats.samples, outlet.as_ref(), &values);
        })))?;

        let outlet = Arc::clone(&self.event_outlet);
        let stats = Arc::clone(&self.stats);
        let registered = self.tracker.set_event_handler(Some(Box::new(move |event: &GazeEvent| {
            let values = event_channels(event, reference_millis_now());
            stats.record(&stats.events, outlet.as_ref(), &values);
        })));
        if let Err(e) = registered {
            self.tracker.set_sample_handler(None).ok();
            return Err(e);
        }

        self.state = BridgeState::Streaming;
        log::info!(
            "Streaming to '{}' and '{}'",
            self.gaze_outlet.stream_name(),
            self.event_outlet.stream_name()
        );
        Ok(())
    }

    /// Deregister handlers and disconnect. Returns the final counters.
    pub fn shutdown(mut self) -> Result<StatsSnapshot> {
        self.teardown()?;
        Ok(self.stats.snapshot())
    }

    fn teardown(&mut self) -> Result<()> {
        if self.state == BridgeState::Closed {
            return Ok(());
        }
        self.state = BridgeState::Closed;

        let sample = self.tracker.set_sample_handler(None);
        let event = self.tracker.set_event_handler(None);
        let disconnect = self.tracker.disconnect();
        log::info!("Disconnected from {} tracker", self.tracker.name());

        sample.and(event).and(disconnect)
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    pub fn system_info(&self) -> &SystemInfo {
        &self.system
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn tracker(&self) -> &T {
        &self.tracker
    }
}

impl<T: EyeTracker> Drop for Bridge<T> {
    fn drop(&mut self) {
        if let Err(e) = self.teardown() {
            log::warn!("Bridge teardown failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use crate::outlet::MemoryOutletFactory;
    use crate::sdk::{SimulatedTracker, SimulationSettings};
    use crate::types::Eye;

    fn quiet_tracker() -> SimulatedTracker {
        SimulatedTracker::new(SimulationSettings {
            generate: false,
            sample_rate: 250,
            ..SimulationSettings::default()
        })
    }

    #[test]
    fn test_connect_opens_both_outlets() {
        let factory = MemoryOutletFactory::new();
        let bridge = Bridge::connect(quiet_tracker(), &factory, BridgeConfig::default()).unwrap();

        assert_eq!(bridge.state(), BridgeState::Connected);
        assert_eq!(bridge.system_info().sample_rate, 250);

        let opened = factory.opened();
        assert_eq!(opened.len(), 2);
        assert_eq!(opened[0].name, "SMI_Raw");
        assert_eq!(opened[1].name, "SMI_Event");
        assert!(opened.iter().all(|s| s.nominal_rate == 250.0));

        let (level, path) = bridge.tracker().logger().unwrap();
        assert_eq!(level, 1);
        assert_eq!(path.to_str(), Some("iViewXSDK_Rust_lsl.txt"));
    }

    #[test]
    fn test_connection_refused() {
        let tracker = SimulatedTracker::new(SimulationSettings {
            refuse_connection: true,
            ..SimulationSettings::default()
        });
        let result = Bridge::connect(tracker, &MemoryOutletFactory::new(), BridgeConfig::default());
        assert!(matches!(result, Err(BridgeError::Connection(_))));
    }

    #[test]
    fn test_invalid_config_never_connects() {
        let mut config = BridgeConfig::default();
        config.endpoints.send_port = 0;
        let factory = MemoryOutletFactory::new();
        let result = Bridge::connect(quiet_tracker(), &factory, config);
        assert!(matches!(result, Err(BridgeError::InvalidConfig(_))));
        assert!(factory.opened().is_empty());
    }

    #[test]
    fn test_records_flow_only_while_streaming() {
        let factory = MemoryOutletFactory::new();
        let mut bridge =
            Bridge::connect(quiet_tracker(), &factory, BridgeConfig::default()).unwrap();

        assert!(!bridge.tracker().emit_sample(&GazeSample::default()));

        bridge.start_streaming().unwrap();
        assert_eq!(bridge.state(), BridgeState::Streaming);

        let sample = GazeSample {
            timestamp_us: 5000,
            ..GazeSample::default()
        };
        assert!(bridge.tracker().emit_sample(&sample));
        let event = GazeEvent {
            event_type: 'F',
            eye: Eye::Right,
            start_time_us: 10,
            end_time_us: 30,
            duration_us: 20,
            position_x: 1.0,
            position_y: 2.0,
        };
        assert!(bridge.tracker().emit_event(&event));

        let stats = bridge.shutdown().unwrap();
        assert_eq!(stats.samples_forwarded, 1);
        assert_eq!(stats.events_forwarded, 1);
        assert_eq!(stats.failed_pushes, 0);

        let raw = factory.samples("SMI_Raw");
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0][0], 5000.0);

        let events = factory.samples("SMI_Event");
        assert_eq!(events.len(), 1);
        assert_eq!(&events[0][..6], &[1.0, 10.0, 30.0, 20.0, 1.0, 2.0]);
        assert!(events[0][6] > 0.0);
    }

    #[test]
    fn test_start_streaming_is_idempotent() {
        let factory = MemoryOutletFactory::new();
        let mut bridge =
            Bridge::connect(quiet_tracker(), &factory, BridgeConfig::default()).unwrap();
        bridge.start_streaming().unwrap();
        bridge.start_streaming().unwrap();

        bridge.tracker().emit_sample(&GazeSample::default());
        assert_eq!(bridge.stats().samples_forwarded, 1);
    }
}
