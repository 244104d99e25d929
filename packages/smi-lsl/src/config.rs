use crate::calibration::CalibrationConfig;
use crate::error::{BridgeError, Result};
use crate::streams::{DeviceMetadata, OutletSettings};
use crate::types::Endpoints;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// SDK log level passed to `iV_SetLogger`
pub const DEFAULT_SDK_LOG_LEVEL: i32 = 1;

/// File the SDK writes its own log to
pub const DEFAULT_SDK_LOG_FILE: &str = "iViewXSDK_Rust_lsl.txt";

/// Bridge configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// iViewX service addresses
    pub endpoints: Endpoints,
    pub sdk_log_level: i32,
    pub sdk_log_file: PathBuf,
    pub calibration: CalibrationConfig,
    /// Start streaming without calibrating
    pub skip_calibration: bool,
    pub outlet: OutletSettings,
    pub metadata: DeviceMetadata,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            sdk_log_level: DEFAULT_SDK_LOG_LEVEL,
            sdk_log_file: PathBuf::from(DEFAULT_SDK_LOG_FILE),
            calibration: CalibrationConfig::default(),
            skip_calibration: false,
            outlet: OutletSettings::default(),
            metadata: DeviceMetadata::default(),
        }
    }
}

impl BridgeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.endpoints.send_ip.trim().is_empty() || self.endpoints.receive_ip.trim().is_empty() {
            return Err(BridgeError::InvalidConfig(
                "send and receive addresses must not be empty".to_string(),
            ));
        }
        if self.endpoints.send_port == 0 || self.endpoints.receive_port == 0 {
            return Err(BridgeError::InvalidConfig(
                "send and receive ports must be non-zero".to_string(),
            ));
        }
        if self.outlet.chunk_size < 0 {
            return Err(BridgeError::InvalidConfig(format!(
                "chunk size must not be negative, got {}",
                self.outlet.chunk_size
            )));
        }
        if self.outlet.max_buffered <= 0 {
            return Err(BridgeError::InvalidConfig(format!(
                "max buffer must be positive, got {}",
                self.outlet.max_buffered
            )));
        }
        let min_accuracy = self.calibration.min_accuracy;
        if min_accuracy.is_nan() || min_accuracy < 0.0 {
            return Err(BridgeError::InvalidConfig(format!(
                "min accuracy must be a non-negative number, got {}",
                min_accuracy
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = BridgeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.endpoints.send_port, 4444);
        assert_eq!(config.endpoints.receive_port, 5555);
        assert_eq!(config.sdk_log_level, 1);
        assert_eq!(config.calibration.min_accuracy, 1.0);
    }

    #[test]
    fn test_rejects_zero_port() {
        let mut config = BridgeConfig::default();
        config.endpoints.receive_port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_outlet_sizes() {
        let mut config = BridgeConfig::default();
        config.outlet.max_buffered = 0;
        assert!(config.validate().is_err());

        let mut config = BridgeConfig::default();
        config.outlet.chunk_size = -1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serializes_to_json() {
        let json = serde_json::to_value(BridgeConfig::default()).unwrap();
        assert_eq!(json["endpoints"]["send_ip"], "127.0.0.1");
        assert_eq!(json["outlet"]["chunk_size"], 32);
        assert_eq!(json["metadata"]["model"], "RED");
    }
}
