//! Bounded log of OCPP frames exchanged by all simulated devices

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Entries kept before the oldest ones are dropped
pub const MESSAGE_LOG_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageDirection {
    Sent,
    Received,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageLogEntry {
    pub direction: MessageDirection,
    /// The frame exactly as it went over the wire
    pub message: Value,
    pub timestamp: DateTime<Utc>,
    pub device_id: String,
    /// Set for CALL frames only
    pub action: Option<String>,
}

impl MessageLogEntry {
    pub fn new(direction: MessageDirection, device_id: &str, message: Value) -> Self {
        let action = match message.as_array().map(Vec::as_slice) {
            Some([kind, _, action, ..]) if kind.as_u64() == Some(2) => {
                action.as_str().map(str::to_string)
            }
            _ => None,
        };

        Self {
            direction,
            message,
            timestamp: Utc::now(),
            device_id: device_id.to_string(),
            action,
        }
    }
}

/// Ring buffer of the most recent frames, newest first.
pub struct MessageLog {
    entries: Mutex<VecDeque<MessageLogEntry>>,
    capacity: usize,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::with_capacity(MESSAGE_LOG_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<MessageLogEntry>> {
        // A panic while holding the guard cannot leave the deque half-updated
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record(&self, direction: MessageDirection, device_id: &str, message: Value) {
        let entry = MessageLogEntry::new(direction, device_id, message);
        let mut entries = self.lock();
        entries.push_front(entry);
        entries.truncate(self.capacity);
    }

    /// Snapshot, most recent first.
    pub fn entries(&self) -> Vec<MessageLogEntry> {
        self.lock().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn action_is_derived_for_calls_only() {
        let call = MessageLogEntry::new(
            MessageDirection::Sent,
            "CP001",
            json!([2, "abc", "Heartbeat", {}]),
        );
        assert_eq!(call.action.as_deref(), Some("Heartbeat"));

        let result = MessageLogEntry::new(
            MessageDirection::Received,
            "CP001",
            json!([3, "abc", {"currentTime": "2024-01-01T00:00:00Z"}]),
        );
        assert!(result.action.is_none());
    }

    #[test]
    fn newest_entry_comes_first() {
        let log = MessageLog::new();
        log.record(MessageDirection::Sent, "CP001", json!([2, "1", "Heartbeat", {}]));
        log.record(MessageDirection::Received, "CP002", json!([3, "1", {}]));

        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].device_id, "CP002");
        assert_eq!(entries[0].direction, MessageDirection::Received);
        assert_eq!(entries[1].device_id, "CP001");
    }

    #[test]
    fn log_is_capped() {
        let log = MessageLog::new();
        for i in 0..150 {
            log.record(
                MessageDirection::Sent,
                "CP001",
                json!([2, i.to_string(), "Heartbeat", {}]),
            );
        }

        let entries = log.entries();
        assert_eq!(entries.len(), MESSAGE_LOG_CAPACITY);
        assert_eq!(entries[0].message[1], "149");
        assert_eq!(entries[MESSAGE_LOG_CAPACITY - 1].message[1], "50");
    }

    #[test]
    fn clear_empties_the_log() {
        let log = MessageLog::new();
        log.record(MessageDirection::Sent, "CP001", json!([2, "1", "Heartbeat", {}]));
        log.clear();
        assert!(log.is_empty());
    }
}
