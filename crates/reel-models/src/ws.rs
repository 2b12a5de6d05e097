//! Log stream message types.
//!
//! Every progress line, error and render outcome broadcast on the log channel
//! is one of these messages, serialized as JSON text frames on `/ws/logs`.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::footage::AssetId;
use crate::render::{RenderId, RenderState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WsMessageType {
    Log,
    Error,
    RenderState,
    Done,
}

impl WsMessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WsMessageType::Log => "log",
            WsMessageType::Error => "error",
            WsMessageType::RenderState => "render_state",
            WsMessageType::Done => "done",
        }
    }
}

/// Log stream envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    /// Progress line
    Log {
        message: String,
        timestamp: DateTime<Utc>,
    },

    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// Render request changed state
    RenderState {
        #[serde(rename = "renderId")]
        render_id: RenderId,
        state: RenderState,
        timestamp: DateTime<Utc>,
    },

    /// Render finished and its output was re-ingested
    Done {
        #[serde(rename = "renderId")]
        render_id: RenderId,
        #[serde(rename = "assetId")]
        asset_id: AssetId,
    },
}

impl WsMessage {
    pub fn log(message: impl Into<String>) -> Self {
        WsMessage::Log {
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create an error message, prefixed with the wall-clock time.
    pub fn error(message: impl Into<String>) -> Self {
        let now = Utc::now();
        WsMessage::Error {
            message: format!("[{}] {}", now.format("%H:%M:%S"), message.into()),
            details: None,
            timestamp: now,
        }
    }

    pub fn error_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        let now = Utc::now();
        WsMessage::Error {
            message: format!("[{}] {}", now.format("%H:%M:%S"), message.into()),
            details: Some(details.into()),
            timestamp: now,
        }
    }

    pub fn render_state(render_id: RenderId, state: RenderState) -> Self {
        WsMessage::RenderState {
            render_id,
            state,
            timestamp: Utc::now(),
        }
    }

    pub fn done(render_id: RenderId, asset_id: AssetId) -> Self {
        WsMessage::Done {
            render_id,
            asset_id,
        }
    }

    pub fn message_type(&self) -> WsMessageType {
        match self {
            WsMessage::Log { .. } => WsMessageType::Log,
            WsMessage::Error { .. } => WsMessageType::Error,
            WsMessage::RenderState { .. } => WsMessageType::RenderState,
            WsMessage::Done { .. } => WsMessageType::Done,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_message_serialization() {
        let msg = WsMessage::log("Sampling frame 3/5");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "log");
        assert_eq!(json["message"], "Sampling frame 3/5");
    }

    #[test]
    fn test_render_state_message() {
        let msg = WsMessage::render_state(RenderId::from("r1"), RenderState::Running);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "render_state");
        assert_eq!(json["renderId"], "r1");
        assert_eq!(json["state"], "RUNNING");
        assert_eq!(msg.message_type().as_str(), "render_state");
    }

    #[test]
    fn test_error_message_has_time_prefix() {
        match WsMessage::error_with_details("render failed", "exit code 1") {
            WsMessage::Error { message, details, .. } => {
                assert!(message.starts_with('['));
                assert!(message.ends_with("render failed"));
                assert_eq!(details.as_deref(), Some("exit code 1"));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
