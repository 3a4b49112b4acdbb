//! Event types published by [`TransferEngine`](crate::engine::TransferEngine).
//!
//! | Event | Transport |
//! |-------|-----------|
//! | `EngineStatusEvent` | `tokio::sync::broadcast` (fan-out to any subscriber) |
//! | `FrameDelivered` | bounded `crossbeam_channel` (dropped when full) |

use serde::{Deserialize, Serialize};

use crate::pipeline::AgentId;

/// Emitted by a reader worker each time it has collected one slice-count
/// worth of transfers into its destination frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameDelivered {
    /// Reader worker that assembled the frame.
    pub reader: AgentId,
    /// Monotonically increasing across all readers.
    pub seq: u64,
    /// RMS level of the destination frame at delivery time.
    pub rms: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatusEvent {
    pub status: EngineStatus,
    /// Optional human-readable detail (e.g. worker counts).
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineStatus {
    /// Constructed, workers never started.
    Idle,
    /// Producer and consumer workers are looping.
    Running,
    /// Workers were stopped and joined.
    Stopped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serialises_lowercase() {
        let ev = EngineStatusEvent {
            status: EngineStatus::Running,
            detail: None,
        };
        let json = serde_json::to_string(&ev).unwrap();
        assert_eq!(json, r#"{"status":"running","detail":null}"#);
    }

    #[test]
    fn frame_delivered_uses_camel_case() {
        let ev = FrameDelivered {
            reader: AgentId(2),
            seq: 9,
            rms: 0.5,
        };
        let value = serde_json::to_value(ev).unwrap();
        assert_eq!(value["reader"], 2);
        assert_eq!(value["seq"], 9);
    }
}
