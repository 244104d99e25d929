use crate::cli::ChannelsArgs;
use crate::exit_codes;
use crate::output;
use serde::Serialize;
use smi_lsl::streams::{
    event_stream, gaze_stream, ChannelSpec, DeviceMetadata, OutletSettings, StreamDefinition,
};

#[derive(Serialize)]
struct StreamLayout {
    name: String,
    #[serde(rename = "type")]
    content_type: String,
    source_id: String,
    channel_count: usize,
    channels: Vec<ChannelSpec>,
}

impl From<StreamDefinition> for StreamLayout {
    fn from(stream: StreamDefinition) -> Self {
        Self {
            channel_count: stream.channel_count(),
            name: stream.name,
            content_type: stream.content_type,
            source_id: stream.source_id,
            channels: stream.channels,
        }
    }
}

fn layouts() -> Vec<StreamLayout> {
    // Nominal rate is taken from the device at connect time
    let metadata = DeviceMetadata::default();
    vec![
        gaze_stream(0.0, OutletSettings::default(), &metadata).into(),
        event_stream(0.0, OutletSettings::default(), &metadata).into(),
    ]
}

pub fn execute(args: ChannelsArgs) -> i32 {
    let layouts = layouts();

    if args.json {
        if let Err(e) = output::emit_json(&layouts, args.output.as_deref()) {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
        return exit_codes::SUCCESS;
    }

    for (i, layout) in layouts.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!(
            "{} (type {}, source {}, {} channels)",
            layout.name, layout.content_type, layout.source_id, layout.channel_count
        );
        println!("  {:<4} {:<20} {:<14} {}", "#", "LABEL", "UNIT", "TYPE");
        for (index, channel) in layout.channels.iter().enumerate() {
            println!(
                "  {:<4} {:<20} {:<14} {}",
                index, channel.label, channel.unit, channel.channel_type
            );
        }
    }

    exit_codes::SUCCESS
}
