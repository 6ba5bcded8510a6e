//! Session clock for gaze timestamps.
//!
//! Dwell and expiry windows are defined in wall-clock milliseconds. Every
//! content session anchors its timestamps to a monotonic epoch captured
//! when the session starts.

use std::time::Instant;

/// Millisecond timestamp relative to the session epoch.
pub type TimestampMs = u64;

/// A session clock that provides monotonic millisecond timestamps relative
/// to a fixed epoch (the moment the content session started).
#[derive(Debug, Clone)]
pub struct SessionClock {
    /// The instant the session started.
    epoch: Instant,

    /// Wall-clock time at epoch (RFC 3339 string).
    epoch_wall: String,
}

impl SessionClock {
    /// Create a new session clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Milliseconds elapsed since session start.
    pub fn now_ms(&self) -> TimestampMs {
        self.epoch.elapsed().as_millis() as TimestampMs
    }

    /// Wall-clock time at session start.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }

    /// Convert fractional seconds (as used by activation times) to milliseconds.
    ///
    /// Negative and non-finite inputs map to zero.
    pub fn secs_to_ms(secs: f64) -> TimestampMs {
        if secs.is_finite() && secs > 0.0 {
            (secs * 1000.0).round() as TimestampMs
        } else {
            0
        }
    }

    /// Convert milliseconds to fractional seconds.
    pub fn ms_to_secs(ms: TimestampMs) -> f64 {
        ms as f64 / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_elapsed() {
        let clock = SessionClock::start();
        assert!(clock.now_ms() < 1000);
        assert!(!clock.epoch_wall().is_empty());
    }

    #[test]
    fn test_secs_to_ms_conversion() {
        assert_eq!(SessionClock::secs_to_ms(1.0), 1000);
        assert_eq!(SessionClock::secs_to_ms(0.5), 500);
        assert_eq!(SessionClock::secs_to_ms(-2.0), 0);
        assert_eq!(SessionClock::secs_to_ms(f64::NAN), 0);
        assert!((SessionClock::ms_to_secs(1500) - 1.5).abs() < 1e-9);
    }
}
