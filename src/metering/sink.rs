//! Where finished records go.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::types::TelemetryRecord;

/// Destination for telemetry records.
///
/// Delivery is best effort: implementations report failures through logs
/// and metrics and never return them to the caller.
#[async_trait]
pub trait MeteringSink: Send + Sync {
    async fn send(&self, record: &TelemetryRecord);
}

/// Sink that keeps every record in memory.
///
/// Used by the CLI's `--dry-run` mode and by tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<TelemetryRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the records received so far, in arrival order.
    pub fn records(&self) -> Vec<TelemetryRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MeteringSink for MemorySink {
    async fn send(&self, record: &TelemetryRecord) {
        match self.records.lock() {
            Ok(mut records) => records.push(record.clone()),
            Err(poisoned) => poisoned.into_inner().push(record.clone()),
        }
    }
}
