use super::{check_channel_count, OutletFactory, SampleOutlet};
use crate::error::Result;
use crate::streams::StreamDefinition;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

type Store = Arc<Mutex<HashMap<String, Vec<Vec<f32>>>>>;

/// Outlet that keeps every pushed sample
pub struct MemoryOutlet {
    name: String,
    channel_count: usize,
    store: Store,
}

impl SampleOutlet for MemoryOutlet {
    fn stream_name(&self) -> &str {
        &self.name
    }

    fn push(&self, values: &[f32]) -> Result<()> {
        check_channel_count(&self.name, self.channel_count, values)?;
        self.store
            .lock()
            .entry(self.name.clone())
            .or_default()
            .push(values.to_vec());
        Ok(())
    }
}

/// Factory whose outlets share one store, keyed by stream name
#[derive(Clone, Default)]
pub struct MemoryOutletFactory {
    store: Store,
    opened: Arc<Mutex<Vec<StreamDefinition>>>,
}

impl MemoryOutletFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Samples pushed to `stream` so far
    pub fn samples(&self, stream: &str) -> Vec<Vec<f32>> {
        self.store.lock().get(stream).cloned().unwrap_or_default()
    }

    /// Definitions of every outlet opened through this factory
    pub fn opened(&self) -> Vec<StreamDefinition> {
        self.opened.lock().clone()
    }
}

impl OutletFactory for MemoryOutletFactory {
    fn open(&self, stream: &StreamDefinition) -> Result<Box<dyn SampleOutlet>> {
        self.opened.lock().push(stream.clone());
        Ok(Box::new(MemoryOutlet {
            name: stream.name.clone(),
            channel_count: stream.channel_count(),
            store: Arc::clone(&self.store),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use crate::streams::{gaze_stream, DeviceMetadata, OutletSettings};

    #[test]
    fn test_memory_outlet_records() {
        let factory = MemoryOutletFactory::new();
        let stream = gaze_stream(60.0, OutletSettings::default(), &DeviceMetadata::default());
        let outlet = factory.open(&stream).unwrap();

        outlet.push(&[0.0; 13]).unwrap();
        outlet.push(&[1.0; 13]).unwrap();

        let samples = factory.samples("SMI_Raw");
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1][12], 1.0);
        assert_eq!(factory.opened().len(), 1);
    }

    #[test]
    fn test_memory_outlet_rejects_wrong_width() {
        let factory = MemoryOutletFactory::new();
        let stream = gaze_stream(60.0, OutletSettings::default(), &DeviceMetadata::default());
        let outlet = factory.open(&stream).unwrap();

        let err = outlet.push(&[0.0; 7]).unwrap_err();
        assert!(matches!(
            err,
            BridgeError::ChannelMismatch {
                expected: 13,
                actual: 7,
                ..
            }
        ));
        assert!(factory.samples("SMI_Raw").is_empty());
    }
}
