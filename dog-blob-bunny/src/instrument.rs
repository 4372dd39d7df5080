//! Instrumentation hooks wrapped around every storage service operation.
//!
//! A service reports each call twice: `start` with the identifying payload before the
//! backend is touched, and `finish` with the annotated payload, the elapsed time and
//! whether the call succeeded. Failures that the service swallows (deletes) or
//! normalizes (uploads, downloads) are still visible here through `payload.error`.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

/// Storage service operations that get instrumented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Upload,
    Download,
    DownloadChunk,
    Delete,
    DeletePrefixed,
    Exist,
    Url,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Download => "download",
            Self::DownloadChunk => "download_chunk",
            Self::Delete => "delete",
            Self::DeletePrefixed => "delete_prefixed",
            Self::Exist => "exist",
            Self::Url => "url",
        }
    }

    /// Event name, e.g. `service_upload.dog_blob`
    pub fn event_name(&self) -> String {
        format!("service_{}.dog_blob", self.as_str())
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured payload describing one operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstrumentPayload {
    pub service: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exist: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InstrumentPayload {
    pub fn new<S: Into<String>>(service: S) -> Self {
        Self {
            service: service.into(),
            ..Default::default()
        }
    }

    pub fn with_key<S: Into<String>>(mut self, key: S) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_checksum(mut self, checksum: Option<String>) -> Self {
        self.checksum = checksum;
        self
    }
}

/// A completed, instrumented operation
#[derive(Debug, Clone, Serialize)]
pub struct InstrumentEvent {
    pub name: String,
    pub operation: Operation,
    pub payload: InstrumentPayload,
    pub duration: Duration,
    pub succeeded: bool,
}

/// Receives instrumentation for storage service operations
pub trait Instrumentation: Send + Sync {
    /// Called before the backend is contacted
    fn start(&self, _operation: Operation, _payload: &InstrumentPayload) {}

    /// Called once the operation has finished, successfully or not
    fn finish(&self, event: &InstrumentEvent);
}

/// Default instrumentation: one `tracing` event per operation
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingInstrumentation;

impl Instrumentation for TracingInstrumentation {
    fn finish(&self, event: &InstrumentEvent) {
        debug!(
            event = %event.name,
            service = %event.payload.service,
            key = event.payload.key.as_deref(),
            prefix = event.payload.prefix.as_deref(),
            exist = event.payload.exist,
            error = event.payload.error.as_deref(),
            succeeded = event.succeeded,
            duration_ms = event.duration.as_secs_f64() * 1000.0,
            "storage operation finished"
        );
    }
}

/// Keeps the most recent events in memory
#[derive(Clone)]
pub struct EventRecorder {
    events: Arc<Mutex<VecDeque<InstrumentEvent>>>,
    capacity: usize,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::with_capacity(10_000)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::new())),
            capacity: capacity.max(1),
        }
    }

    /// Snapshot of recorded events, oldest first
    pub fn events(&self) -> Vec<InstrumentEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Most recent event for an operation
    pub fn last(&self, operation: Operation) -> Option<InstrumentEvent> {
        self.events
            .lock()
            .iter()
            .rev()
            .find(|event| event.operation == operation)
            .cloned()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Default for EventRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl Instrumentation for EventRecorder {
    fn finish(&self, event: &InstrumentEvent) {
        let mut events = self.events.lock();
        events.push_back(event.clone());
        while events.len() > self.capacity {
            events.pop_front();
        }
    }
}
