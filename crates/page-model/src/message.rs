//! Outbound messages for the UI surface.
//!
//! Delivery is fire-and-forget: a missing receiver is not an error the
//! engine acts on.

use serde::{Deserialize, Serialize};

/// A message emitted by the focus engine.
///
/// Serialized as `{"type": "...", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum OutboundMessage {
    /// One fully smoothed sample, normalized to the viewport.
    GazeData {
        /// Normalized X coordinate [0.0, 1.0].
        x: f64,
        /// Normalized Y coordinate [0.0, 1.0].
        y: f64,
        blink: bool,
    },

    /// Ask the configuration service for an entry for an unknown tag.
    #[serde(rename = "updateConfig")]
    ConfigRequest { tag: String },
}

impl OutboundMessage {
    pub fn gaze(x: f64, y: f64, blink: bool) -> Self {
        Self::GazeData { x, y, blink }
    }

    pub fn config_request(tag: impl Into<String>) -> Self {
        Self::ConfigRequest { tag: tag.into() }
    }
}
