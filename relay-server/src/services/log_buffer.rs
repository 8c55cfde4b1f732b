//! Bounded buffer of studio output forwarded by the plugin

use chrono::Utc;
use parking_lot::Mutex;
use shared::{StudioLogEntry, StudioLogRecord};
use std::collections::VecDeque;

pub const DEFAULT_LOG_CAPACITY: usize = 200;

/// Ring buffer of the most recent studio log lines; the oldest are dropped first
#[derive(Debug)]
pub struct StudioLogBuffer {
    capacity: usize,
    records: Mutex<VecDeque<StudioLogRecord>>,
}

impl StudioLogBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            records: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a batch stamped with the current time. Returns how many were accepted.
    pub fn push_batch(&self, entries: Vec<StudioLogEntry>) -> usize {
        let received = entries.len();
        let received_at = Utc::now();
        let mut records = self.records.lock();
        for entry in entries {
            if records.len() == self.capacity {
                records.pop_front();
            }
            records.push_back(StudioLogRecord { entry, received_at });
        }
        received
    }

    /// Up to `limit` of the newest records, oldest first
    pub fn recent(&self, limit: usize) -> Vec<StudioLogRecord> {
        let records = self.records.lock();
        let skip = records.len().saturating_sub(limit);
        records.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl Default for StudioLogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}
