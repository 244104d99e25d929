use super::{check_channel_count, OutletFactory, SampleOutlet};
use crate::error::Result;
use crate::streams::StreamDefinition;
use parking_lot::Mutex;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

#[derive(Serialize)]
struct Record<'a> {
    stream: &'a str,
    channels: &'a [String],
    values: &'a [f32],
    received_at: String,
}

/// Outlet writing one JSON object per sample
pub struct JsonLinesOutlet {
    name: String,
    labels: Vec<String>,
    writer: SharedWriter,
}

impl SampleOutlet for JsonLinesOutlet {
    fn stream_name(&self) -> &str {
        &self.name
    }

    fn push(&self, values: &[f32]) -> Result<()> {
        check_channel_count(&self.name, self.labels.len(), values)?;
        let record = Record {
            stream: &self.name,
            channels: &self.labels,
            values,
            received_at: chrono::Utc::now().to_rfc3339(),
        };
        let line = serde_json::to_string(&record)?;

        let mut writer = self.writer.lock();
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

/// Factory whose outlets interleave records on one writer
#[derive(Clone)]
pub struct JsonLinesOutletFactory {
    writer: SharedWriter,
}

impl JsonLinesOutletFactory {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Create (or truncate) `path` and write records to it.
    pub fn file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl OutletFactory for JsonLinesOutletFactory {
    fn open(&self, stream: &StreamDefinition) -> Result<Box<dyn SampleOutlet>> {
        log::info!(
            "Opened JSON outlet '{}' ({} channels, {} Hz)",
            stream.name,
            stream.channel_count(),
            stream.nominal_rate
        );
        Ok(Box::new(JsonLinesOutlet {
            name: stream.name.clone(),
            labels: stream.channels.iter().map(|c| c.label.clone()).collect(),
            writer: Arc::clone(&self.writer),
        }))
    }
}
