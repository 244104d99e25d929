// Lab Streaming Layer outlets
//
// Publishes each stream definition as a float32 LSL outlet, with the device
// metadata and per-channel label/unit/type in the stream description.

use super::{check_channel_count, OutletFactory, SampleOutlet};
use crate::error::{BridgeError, Result};
use crate::streams::StreamDefinition;
use ::lsl::{ChannelFormat, Pushable, StreamInfo, StreamOutlet};
use parking_lot::Mutex;

pub struct LslOutlet {
    name: String,
    channel_count: usize,
    outlet: Mutex<StreamOutlet>,
}

impl SampleOutlet for LslOutlet {
    fn stream_name(&self) -> &str {
        &self.name
    }

    fn push(&self, values: &[f32]) -> Result<()> {
        check_channel_count(&self.name, self.channel_count, values)?;
        let sample = values.to_vec();
        self.outlet
            .lock()
            .push_sample(&sample)
            .map_err(|e| BridgeError::Outlet(format!("LSL push to '{}' failed: {:?}", self.name, e)))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LslOutletFactory;

impl LslOutletFactory {
    pub fn new() -> Self {
        Self
    }

    fn stream_info(stream: &StreamDefinition) -> Result<StreamInfo> {
        let mut info = StreamInfo::new(
            &stream.name,
            &stream.content_type,
            stream.channel_count() as u32,
            stream.nominal_rate,
            ChannelFormat::Float32,
            &stream.source_id,
        )
        .map_err(|e| BridgeError::Outlet(format!("Invalid stream info '{}': {:?}", stream.name, e)))?;

        info.desc()
            .append_child_value("manufacturer", &stream.metadata.manufacturer);
        info.desc().append_child_value("model", &stream.metadata.model);
        info.desc().append_child_value("api", &stream.metadata.api);

        let mut channels = info.desc().append_child("channels");
        for channel in &stream.channels {
            channels
                .append_child("channel")
                .append_child_value("label", &channel.label)
                .append_child_value("unit", &channel.unit)
                .append_child_value("type", &channel.channel_type);
        }

        Ok(info)
    }
}

impl OutletFactory for LslOutletFactory {
    fn open(&self, stream: &StreamDefinition) -> Result<Box<dyn SampleOutlet>> {
        let info = Self::stream_info(stream)?;
        let outlet = StreamOutlet::new(&info, stream.outlet.chunk_size, stream.outlet.max_buffered)
            .map_err(|e| {
                BridgeError::Outlet(format!("Failed to create LSL outlet '{}': {:?}", stream.name, e))
            })?;

        log::info!(
            "Opened LSL outlet '{}' (type={}, channels={}, rate={} Hz, source_id={})",
            stream.name,
            stream.content_type,
            stream.channel_count(),
            stream.nominal_rate,
            stream.source_id
        );

        Ok(Box::new(LslOutlet {
            name: stream.name.clone(),
            channel_count: stream.channel_count(),
            outlet: Mutex::new(outlet),
        }))
    }
}
