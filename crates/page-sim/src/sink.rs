//! Message sink that records what the engine sends.

use gazelens_common::error::{GazelensError, GazelensResult};
use gazelens_page_model::message::OutboundMessage;
use gazelens_platform_core::MessageSink;

/// Keeps every delivered message in memory.
#[derive(Debug)]
pub struct RecordingSink {
    messages: Vec<OutboundMessage>,
    connected: bool,
    rejected: u64,
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            connected: true,
            rejected: 0,
        }
    }

    /// A sink with no listener: every send fails.
    pub fn disconnected() -> Self {
        Self {
            connected: false,
            ..Self::new()
        }
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    pub fn messages(&self) -> &[OutboundMessage] {
        &self.messages
    }

    /// Delivered gaze payloads as `(x, y, blink)`.
    pub fn gaze_points(&self) -> Vec<(f64, f64, bool)> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                OutboundMessage::GazeData { x, y, blink } => Some((*x, *y, *blink)),
                _ => None,
            })
            .collect()
    }

    /// Tags the engine asked configuration for.
    pub fn config_requests(&self) -> Vec<String> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                OutboundMessage::ConfigRequest { tag } => Some(tag.clone()),
                _ => None,
            })
            .collect()
    }

    /// Sends that failed because nobody was listening.
    pub fn rejected(&self) -> u64 {
        self.rejected
    }
}

impl MessageSink for RecordingSink {
    fn send(&mut self, message: &OutboundMessage) -> GazelensResult<()> {
        if !self.connected {
            self.rejected += 1;
            return Err(GazelensError::messaging("receiving end does not exist"));
        }
        self.messages.push(message.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnected_sink_rejects() {
        let mut sink = RecordingSink::disconnected();
        assert!(sink.send(&OutboundMessage::gaze(0.1, 0.2, false)).is_err());
        assert!(sink.messages().is_empty());
        assert_eq!(sink.rejected(), 1);
    }

    #[test]
    fn test_filters_by_kind() {
        let mut sink = RecordingSink::new();
        sink.send(&OutboundMessage::gaze(0.1, 0.2, false)).unwrap();
        sink.send(&OutboundMessage::config_request("span")).unwrap();
        assert_eq!(sink.gaze_points(), vec![(0.1, 0.2, false)]);
        assert_eq!(sink.config_requests(), vec!["span".to_string()]);
    }
}
