use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-eye values of a gaze sample
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EyeData {
    pub gaze_x: f64,
    pub gaze_y: f64,
    pub diameter: f64,
    pub position_x: f64,
    pub position_y: f64,
    pub position_z: f64,
}

/// Binocular gaze sample as delivered by the sample callback
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GazeSample {
    pub timestamp_us: i64,
    pub left: EyeData,
    pub right: EyeData,
    pub plane_number: i32,
}

/// Which eye an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Eye {
    Left,
    Right,
    Unknown,
}

impl Eye {
    /// Parse the eye label reported by the SDK.
    pub fn from_label(label: &str) -> Self {
        match label {
            "l" | "L" | "LEFT" | "left" | "Left" => Eye::Left,
            "r" | "R" | "RIGHT" | "right" | "Right" => Eye::Right,
            _ => Eye::Unknown,
        }
    }

    /// Numeric channel value: left -1, right 1, unknown 0.
    pub fn code(self) -> i32 {
        match self {
            Eye::Left => -1,
            Eye::Right => 1,
            Eye::Unknown => 0,
        }
    }
}

impl From<char> for Eye {
    fn from(c: char) -> Self {
        let mut buf = [0u8; 4];
        Eye::from_label(c.encode_utf8(&mut buf))
    }
}

/// Fixation or saccade event as delivered by the event callback
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazeEvent {
    /// SDK event type tag ('F' for fixations)
    pub event_type: char,
    pub eye: Eye,
    pub start_time_us: i64,
    pub end_time_us: i64,
    pub duration_us: i64,
    pub position_x: f64,
    pub position_y: f64,
}

/// Eye-tracking device family reported by the SDK
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceKind {
    None,
    Red,
    RedM,
    HiSpeed,
    Mri,
    Hed,
    Etg,
    Custom,
    Unrecognized(i32),
}

impl DeviceKind {
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => DeviceKind::None,
            1 => DeviceKind::Red,
            2 => DeviceKind::RedM,
            3 => DeviceKind::HiSpeed,
            4 => DeviceKind::Mri,
            5 => DeviceKind::Hed,
            6 => DeviceKind::Etg,
            7 => DeviceKind::Custom,
            other => DeviceKind::Unrecognized(other),
        }
    }
}

/// Three-part version number
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub major: i32,
    pub minor: i32,
    pub build: i32,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.build)
    }
}

/// System information reported after connecting
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub sample_rate: i32,
    pub iview_version: Version,
    pub api_version: Version,
    pub device: DeviceKind,
}

impl SystemInfo {
    /// Sample rate used as the nominal rate of both outlets.
    pub fn nominal_rate(&self) -> f64 {
        f64::from(self.sample_rate).round()
    }
}

/// Validation deviations in degrees of visual angle
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Accuracy {
    pub deviation_lx: f64,
    pub deviation_ly: f64,
    pub deviation_rx: f64,
    pub deviation_ry: f64,
}

impl Accuracy {
    pub fn worst(&self) -> f64 {
        self.deviation_lx
            .max(self.deviation_ly)
            .max(self.deviation_rx)
            .max(self.deviation_ry)
    }

    /// True when no deviation exceeds `threshold`.
    pub fn within(&self, threshold: f64) -> bool {
        [
            self.deviation_lx,
            self.deviation_ly,
            self.deviation_rx,
            self.deviation_ry,
        ]
        .iter()
        .all(|d| *d <= threshold)
    }
}

/// Calibration setup passed to the SDK
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSettings {
    /// Number of calibration points
    pub method: i32,
    pub visualization: i32,
    pub display_device: i32,
    pub speed: i32,
    pub auto_accept: bool,
    pub foreground_brightness: i32,
    pub background_brightness: i32,
    pub target_shape: i32,
    pub target_size: i32,
    pub target_filename: String,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            method: 9,
            visualization: 1,
            display_device: 1,
            speed: 0,
            auto_accept: true,
            foreground_brightness: 250,
            background_brightness: 220,
            target_shape: 2,
            target_size: 20,
            target_filename: String::new(),
        }
    }
}

/// Addresses used to reach the iViewX service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    pub send_ip: String,
    pub send_port: u16,
    pub receive_ip: String,
    pub receive_port: u16,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            send_ip: "127.0.0.1".to_string(),
            send_port: 4444,
            receive_ip: "127.0.0.1".to_string(),
            receive_port: 5555,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eye_labels() {
        for label in ["l", "L", "LEFT", "left", "Left"] {
            assert_eq!(Eye::from_label(label), Eye::Left);
        }
        for label in ["r", "R", "RIGHT", "right", "Right"] {
            assert_eq!(Eye::from_label(label), Eye::Right);
        }
        assert_eq!(Eye::from_label("b"), Eye::Unknown);
        assert_eq!(Eye::from_label(""), Eye::Unknown);
        assert_eq!(Eye::from('l'), Eye::Left);
        assert_eq!(Eye::from('x'), Eye::Unknown);
    }

    #[test]
    fn test_eye_codes() {
        assert_eq!(Eye::Left.code(), -1);
        assert_eq!(Eye::Right.code(), 1);
        assert_eq!(Eye::Unknown.code(), 0);
    }

    #[test]
    fn test_accuracy_threshold() {
        let acc = Accuracy {
            deviation_lx: 0.4,
            deviation_ly: 1.0,
            deviation_rx: 0.2,
            deviation_ry: 0.9,
        };
        assert!(acc.within(1.0));
        assert!(!acc.within(0.95));
        assert_eq!(acc.worst(), 1.0);
    }

    #[test]
    fn test_nominal_rate_rounds() {
        let info = SystemInfo {
            sample_rate: 250,
            iview_version: Version::default(),
            api_version: Version { major: 3, minor: 6, build: 2 },
            device: DeviceKind::Red,
        };
        assert_eq!(info.nominal_rate(), 250.0);
        assert_eq!(info.api_version.to_string(), "3.6.2");
    }

    #[test]
    fn test_device_kind_from_raw() {
        assert_eq!(DeviceKind::from_raw(1), DeviceKind::Red);
        assert_eq!(DeviceKind::from_raw(42), DeviceKind::Unrecognized(42));
    }
}
