//! Local cost sink

use crate::error::{CostError, Result};
use crate::provider::{CostRecord, CostSink};
use async_trait::async_trait;
use std::io::Write;
use std::sync::Mutex;

/// Writes each record as one JSON line.
pub struct StdoutSink<W: Write + Send = std::io::Stdout> {
    out: Mutex<W>,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self {
            out: Mutex::new(std::io::stdout()),
        }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Send> StdoutSink<W> {
    pub fn with_writer(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> Result<W> {
        self.out
            .into_inner()
            .map_err(|e| CostError::Sink(format!("writer lock poisoned: {}", e)))
    }
}

#[async_trait]
impl<W: Write + Send> CostSink for StdoutSink<W> {
    async fn emit(&self, record: &CostRecord) -> Result<()> {
        let line = serde_json::to_string(record)?;
        let mut out = self
            .out
            .lock()
            .map_err(|e| CostError::Sink(format!("writer lock poisoned: {}", e)))?;
        writeln!(out, "{}", line)?;
        out.flush()?;
        Ok(())
    }
}
