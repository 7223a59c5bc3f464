//! Stream events emitted to consumers
//!
//! The NDJSON-facing tagged union: exactly one terminal event (`done` or
//! `error`) per stream, with `ping` heartbeats keeping idle connections
//! alive.

use serde::{Deserialize, Serialize};

use crate::source::SourceRef;

/// Heartbeat interval for idle streams
pub const PING_INTERVAL_SECS: u64 = 5;

/// Events a driver stream yields to its consumer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StreamEvent {
    /// First event of every stream
    Start { model: String },
    /// Retrieved sources (quick answer only)
    Sources { list: Vec<SourceRef> },
    TextDelta { text: String },
    ToolCall {
        step: usize,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        step: usize,
        name: String,
        output: serde_json::Value,
    },
    /// Terminal success
    Done { model: String },
    /// Terminal failure
    Error { message: String },
    /// Heartbeat
    Ping,
}

impl StreamEvent {
    /// Whether this event terminates the stream
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_tags() {
        let cases = [
            (
                serde_json::to_string(&StreamEvent::Start {
                    model: "m".to_string(),
                })
                .expect("json"),
                r#""type":"start""#,
            ),
            (
                serde_json::to_string(&StreamEvent::Ping).expect("json"),
                r#""type":"ping""#,
            ),
            (
                serde_json::to_string(&StreamEvent::ToolCall {
                    step: 1,
                    name: "read".to_string(),
                    input: serde_json::json!({}),
                })
                .expect("json"),
                r#""type":"tool-call""#,
            ),
        ];
        for (json, tag) in cases {
            assert!(json.contains(tag), "{json} missing {tag}");
        }
    }

    #[test]
    fn test_terminality() {
        assert!(StreamEvent::Done {
            model: "m".to_string()
        }
        .is_terminal());
        assert!(StreamEvent::Error {
            message: "boom".to_string()
        }
        .is_terminal());
        assert!(!StreamEvent::Ping.is_terminal());
    }
}
