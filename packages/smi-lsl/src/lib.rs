pub mod bridge;
pub mod calibration;
pub mod config;
pub mod console;
pub mod error;
pub mod mapping;
pub mod outlet;
pub mod sdk;
pub mod streams;
pub mod types;

pub use bridge::{Bridge, BridgeState, StatsSnapshot};
pub use calibration::{
    run_calibration, CalibrationChoice, CalibrationConfig, CalibrationOutcome, CalibrationPrompt,
    ConsolePrompt,
};
pub use config::BridgeConfig;
pub use error::{BridgeError, Result};
pub use sdk::{EyeTracker, IViewX, ReturnCode, SimulatedTracker, SimulationSettings};
pub use types::*;
