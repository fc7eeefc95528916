//! Incremental NDJSON decoder for `/api/pull` progress streams
//!
//! The daemon writes one JSON object per line, but HTTP chunk boundaries
//! fall anywhere. Bytes are buffered until a newline arrives; each complete
//! line yields exactly one event, in the order it was received.

use crate::errors::{ProvisionError, Result};
use crate::models::types::ProgressEvent;
use serde_json::Value;

/// Maximum bytes held for a single unterminated line (1MB)
pub const MAX_LINE_BYTES: usize = 1_048_576;

/// Line-oriented decoder for progress events
#[derive(Debug)]
pub struct NdjsonDecoder {
    buffer: Vec<u8>,
    max_line_bytes: usize,
}

impl Default for NdjsonDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::with_capacity(MAX_LINE_BYTES)
    }

    pub fn with_capacity(max_line_bytes: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            max_line_bytes,
        }
    }

    /// Feed a chunk and return every event completed by it
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<ProgressEvent>> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = parse_line(&line[..line.len() - 1])? {
                events.push(event);
            }
        }

        if self.buffer.len() > self.max_line_bytes {
            return Err(ProvisionError::Protocol(format!(
                "Progress line exceeds {} bytes",
                self.max_line_bytes
            )));
        }

        Ok(events)
    }

    /// Flush a trailing line that was not newline-terminated
    pub fn finish(&mut self) -> Result<Option<ProgressEvent>> {
        let rest = std::mem::take(&mut self.buffer);
        parse_line(&rest)
    }
}

fn parse_line(line: &[u8]) -> Result<Option<ProgressEvent>> {
    let text = String::from_utf8_lossy(line);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => Ok(Some(ProgressEvent::from(map))),
        Ok(other) => Err(ProvisionError::Protocol(format!(
            "Expected JSON object in progress stream, got: {}",
            other
        ))),
        Err(e) => Err(ProvisionError::Protocol(format!(
            "Invalid progress line: {}",
            e
        ))),
    }
}
