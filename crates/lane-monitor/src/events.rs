//! JSON-lines event log

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use adas::LaneEvent;

use crate::MonitorError;

/// Appends one JSON object per processed frame
pub struct EventLog<W: Write> {
    writer: W,
    written: u64,
}

impl EventLog<Box<dyn Write + Send>> {
    /// Create (or truncate) a log file
    pub fn create(path: impl AsRef<Path>) -> Result<Self, MonitorError> {
        Ok(Self::new(Box::new(BufWriter::new(File::create(path)?))))
    }
}

impl<W: Write> EventLog<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    pub fn append(&mut self, event: &LaneEvent) -> Result<(), MonitorError> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), MonitorError> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
