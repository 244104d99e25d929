// Eye-tracker device access
//
// `EyeTracker` mirrors the fixed call sequence of the iViewX SDK. The real
// device is reached through `IViewX` (runtime-loaded vendor library); the
// `SimulatedTracker` stands in for it without hardware.

pub mod ffi;
pub mod return_codes;
pub mod simulated;

pub use ffi::{default_library_name, find_library, require_library, IViewX, DEFAULT_LIBRARY_PATHS};
pub use return_codes::ReturnCode;
pub use simulated::{SimulatedTracker, SimulationSettings};

use crate::error::{BridgeError, Result};
use crate::types::{
    Accuracy, CalibrationSettings, Endpoints, GazeEvent, GazeSample, SystemInfo,
};
use std::path::Path;

/// Closure invoked for every gaze sample, on the SDK's delivery thread
pub type SampleHandler = Box<dyn Fn(&GazeSample) + Send + Sync + 'static>;

/// Closure invoked for every fixation/saccade event, on the SDK's delivery thread
pub type EventHandler = Box<dyn Fn(&GazeEvent) + Send + Sync + 'static>;

/// Device driver seam
///
/// Every method corresponds to one SDK call. Implementations return
/// `BridgeError::Sdk` carrying the SDK return code when a call fails.
pub trait EyeTracker: Send {
    /// Short name used in log output
    fn name(&self) -> &str;

    fn connect(&mut self, endpoints: &Endpoints) -> Result<()>;

    fn set_logger(&mut self, level: i32, path: &Path) -> Result<()>;

    fn system_info(&mut self) -> Result<SystemInfo>;

    fn setup_calibration(&mut self, settings: &CalibrationSettings) -> Result<()>;

    fn calibrate(&mut self) -> Result<()>;

    fn validate(&mut self) -> Result<()>;

    fn accuracy(&mut self) -> Result<Accuracy>;

    /// Register (`Some`) or remove (`None`) the sample handler
    fn set_sample_handler(&mut self, handler: Option<SampleHandler>) -> Result<()>;

    /// Register (`Some`) or remove (`None`) the event handler
    fn set_event_handler(&mut self, handler: Option<EventHandler>) -> Result<()>;

    fn disconnect(&mut self) -> Result<()>;
}

impl<T: EyeTracker + ?Sized> EyeTracker for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn connect(&mut self, endpoints: &Endpoints) -> Result<()> {
        (**self).connect(endpoints)
    }

    fn set_logger(&mut self, level: i32, path: &Path) -> Result<()> {
        (**self).set_logger(level, path)
    }

    fn system_info(&mut self) -> Result<SystemInfo> {
        (**self).system_info()
    }

    fn setup_calibration(&mut self, settings: &CalibrationSettings) -> Result<()> {
        (**self).setup_calibration(settings)
    }

    fn calibrate(&mut self) -> Result<()> {
        (**self).calibrate()
    }

    fn validate(&mut self) -> Result<()> {
        (**self).validate()
    }

    fn accuracy(&mut self) -> Result<Accuracy> {
        (**self).accuracy()
    }

    fn set_sample_handler(&mut self, handler: Option<SampleHandler>) -> Result<()> {
        (**self).set_sample_handler(handler)
    }

    fn set_event_handler(&mut self, handler: Option<EventHandler>) -> Result<()> {
        (**self).set_event_handler(handler)
    }

    fn disconnect(&mut self) -> Result<()> {
        (**self).disconnect()
    }
}

/// Fail `call` with `ERR_NOT_CONNECTED` unless a connection is open.
///
/// Both trackers report a missing connection the way the SDK itself does, so
/// the calibration loop treats it like any other failed step.
pub(crate) fn require_connected(connected: bool, call: &'static str) -> Result<()> {
    if connected {
        Ok(())
    } else {
        Err(BridgeError::Sdk {
            call,
            code: ReturnCode::NOT_CONNECTED,
        })
    }
}
