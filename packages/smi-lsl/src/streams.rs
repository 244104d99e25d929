// Outlet definitions for the gaze and event streams
//
// Channel order here is the contract with downstream consumers and must stay
// in sync with `mapping::gaze_channels` / `mapping::event_channels`.

use crate::mapping::{EVENT_CHANNELS, GAZE_CHANNELS};
use serde::{Deserialize, Serialize};

pub const GAZE_STREAM_NAME: &str = "SMI_Raw";
pub const GAZE_STREAM_TYPE: &str = "Gaze";
pub const GAZE_SOURCE_ID: &str = "smiraw500xa15";

pub const EVENT_STREAM_NAME: &str = "SMI_Event";
pub const EVENT_STREAM_TYPE: &str = "Event";
pub const EVENT_SOURCE_ID: &str = "smievent500ds15";

/// Samples per outlet chunk
pub const DEFAULT_CHUNK_SIZE: i32 = 32;

/// Maximum outlet buffer in seconds
pub const DEFAULT_MAX_BUFFERED: i32 = 30;

/// One channel entry of the stream description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub label: String,
    pub unit: String,
    #[serde(rename = "type")]
    pub channel_type: String,
}

impl ChannelSpec {
    fn new(label: &str, unit: &str, channel_type: &str) -> Self {
        Self {
            label: label.to_string(),
            unit: unit.to_string(),
            channel_type: channel_type.to_string(),
        }
    }
}

/// Descriptive metadata attached to both streams
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceMetadata {
    pub manufacturer: String,
    pub model: String,
    pub api: String,
}

impl Default for DeviceMetadata {
    fn default() -> Self {
        Self {
            manufacturer: "SMI".to_string(),
            model: "RED".to_string(),
            api: "iViewRustLSL".to_string(),
        }
    }
}

/// Outlet sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutletSettings {
    pub chunk_size: i32,
    pub max_buffered: i32,
}

impl Default for OutletSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_buffered: DEFAULT_MAX_BUFFERED,
        }
    }
}

/// Everything needed to open one float32 outlet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDefinition {
    pub name: String,
    pub content_type: String,
    pub source_id: String,
    pub nominal_rate: f64,
    pub outlet: OutletSettings,
    pub metadata: DeviceMetadata,
    pub channels: Vec<ChannelSpec>,
}

impl StreamDefinition {
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.label.as_str()).collect()
    }
}

fn gaze_channel_specs() -> Vec<ChannelSpec> {
    let mut channels = vec![ChannelSpec::new("timestamp", "microseconds", GAZE_STREAM_TYPE)];
    channels.extend(
        ["leftGazeX", "leftGazeY"]
            .iter()
            .map(|label| ChannelSpec::new(label, "pixels", GAZE_STREAM_TYPE)),
    );
    channels.extend(
        [
            "leftDiam",
            "leftEyePositionX",
            "leftEyePositionY",
            "leftEyePositionZ",
            "rightGazeX",
            "rightGazeY",
            "rightDiam",
            "rightEyePositionX",
            "rightEyePositionY",
            "rightEyePositionZ",
        ]
        .iter()
        .map(|label| ChannelSpec::new(label, "millimetres", GAZE_STREAM_TYPE)),
    );
    debug_assert_eq!(channels.len(), GAZE_CHANNELS);
    channels
}

fn event_channel_specs() -> Vec<ChannelSpec> {
    let mut channels = vec![ChannelSpec::new("eye", "index", EVENT_STREAM_TYPE)];
    channels.extend(
        ["startTime", "endTime", "duration"]
            .iter()
            .map(|label| ChannelSpec::new(label, "microseconds", EVENT_STREAM_TYPE)),
    );
    channels.extend(
        ["positionX", "positionY"]
            .iter()
            .map(|label| ChannelSpec::new(label, "pixels", EVENT_STREAM_TYPE)),
    );
    channels.push(ChannelSpec::new("marcotime", "milliseconds", EVENT_STREAM_TYPE));
    debug_assert_eq!(channels.len(), EVENT_CHANNELS);
    channels
}

/// Raw gaze stream (`SMI_Raw`, 13 channels)
pub fn gaze_stream(
    nominal_rate: f64,
    outlet: OutletSettings,
    metadata: &DeviceMetadata,
) -> StreamDefinition {
    StreamDefinition {
        name: GAZE_STREAM_NAME.to_string(),
        content_type: GAZE_STREAM_TYPE.to_string(),
        source_id: GAZE_SOURCE_ID.to_string(),
        nominal_rate,
        outlet,
        metadata: metadata.clone(),
        channels: gaze_channel_specs(),
    }
}

/// Fixation/saccade event stream (`SMI_Event`, 7 channels)
pub fn event_stream(
    nominal_rate: f64,
    outlet: OutletSettings,
    metadata: &DeviceMetadata,
) -> StreamDefinition {
    StreamDefinition {
        name: EVENT_STREAM_NAME.to_string(),
        content_type: EVENT_STREAM_TYPE.to_string(),
        source_id: EVENT_SOURCE_ID.to_string(),
        nominal_rate,
        outlet,
        metadata: metadata.clone(),
        channels: event_channel_specs(),
    }
}
