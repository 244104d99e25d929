// Outbound sinks for mapped records
//
// - `lsl`: Lab Streaming Layer outlets (feature `lsl-support`)
// - `json`: newline-delimited JSON to stdout or a file
// - `memory`: in-process capture

pub mod json;
#[cfg(feature = "lsl-support")]
pub mod lsl;
pub mod memory;

pub use json::{JsonLinesOutlet, JsonLinesOutletFactory};
#[cfg(feature = "lsl-support")]
pub use self::lsl::{LslOutlet, LslOutletFactory};
pub use memory::{MemoryOutlet, MemoryOutletFactory};

use crate::error::{BridgeError, Result};
use crate::streams::StreamDefinition;

/// One open stream that accepts float32 samples
///
/// `push` is called from the SDK's delivery thread.
pub trait SampleOutlet: Send + Sync {
    fn stream_name(&self) -> &str;

    fn push(&self, values: &[f32]) -> Result<()>;
}

/// Opens outlets for stream definitions
pub trait OutletFactory {
    fn open(&self, stream: &StreamDefinition) -> Result<Box<dyn SampleOutlet>>;
}

/// True when this build can open LSL outlets.
pub fn lsl_available() -> bool {
    cfg!(feature = "lsl-support")
}

pub(crate) fn check_channel_count(stream: &str, expected: usize, values: &[f32]) -> Result<()> {
    if values.len() == expected {
        Ok(())
    } else {
        Err(BridgeError::ChannelMismatch {
            stream: stream.to_string(),
            expected,
            actual: values.len(),
        })
    }
}
