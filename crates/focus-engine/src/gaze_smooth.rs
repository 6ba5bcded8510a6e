//! Gaze sample stabilization.
//!
//! Raw estimates jitter by tens of pixels from frame to frame. The smoother
//! keeps a short moving average of raw coordinates and, alongside it, a
//! session-long running average of the eye aspect ratio. A sample whose
//! ratio strays far from that average is flagged as a blink (an
//! eye-geometry anomaly, not a true blink detector).

use std::collections::VecDeque;

use gazelens_common::config::EngineTuning;
use gazelens_page_model::sample::{RawGazeSample, StabilizedSample};

/// Smoother tuning.
#[derive(Debug, Clone, Copy)]
pub struct SmootherConfig {
    /// Samples in the moving-average window (and the startup latency).
    pub window: usize,

    /// Eye-ratio deviation above which `blink` is set.
    pub blink_deviation_threshold: f64,
}

impl Default for SmootherConfig {
    fn default() -> Self {
        Self {
            window: 5,
            blink_deviation_threshold: 0.4,
        }
    }
}

impl From<&EngineTuning> for SmootherConfig {
    fn from(tuning: &EngineTuning) -> Self {
        Self {
            window: tuning.smoothing_window,
            blink_deviation_threshold: tuning.blink_deviation_threshold,
        }
    }
}

/// Cumulative mean over the whole session. Never reset while the session lives.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunningAverage {
    sum: f64,
    count: u64,
}

impl RunningAverage {
    /// Add a value and return the updated mean.
    pub fn push(&mut self, value: f64) -> f64 {
        self.sum += value;
        self.count += 1;
        self.sum / self.count as f64
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

/// Moving-average gaze smoother with an eye-ratio anomaly flag.
#[derive(Debug, Clone)]
pub struct GazeSmoother {
    config: SmootherConfig,
    window: VecDeque<(f64, f64)>,
    sum_x: f64,
    sum_y: f64,
    eye_ratio: RunningAverage,
    last_deviation: Option<f64>,
    dropped: u64,
}

impl Default for GazeSmoother {
    fn default() -> Self {
        Self::new(SmootherConfig::default())
    }
}

impl GazeSmoother {
    pub fn new(config: SmootherConfig) -> Self {
        let config = SmootherConfig {
            window: config.window.max(1),
            ..config
        };
        Self {
            config,
            window: VecDeque::with_capacity(config.window + 1),
            sum_x: 0.0,
            sum_y: 0.0,
            eye_ratio: RunningAverage::default(),
            last_deviation: None,
            dropped: 0,
        }
    }

    /// Feed one raw sample.
    ///
    /// Returns `None` until the window is full, then one stabilized sample per
    /// call. Samples without eye geometry or with a non-finite position are
    /// dropped and leave all state untouched. Degenerate eye geometry keeps
    /// the position and repeats the last blink decision.
    pub fn feed(&mut self, sample: &RawGazeSample) -> Option<StabilizedSample> {
        let Some(features) = sample.eye_features else {
            self.dropped += 1;
            tracing::debug!(x = sample.x, y = sample.y, "Dropping gaze sample without eye features");
            return None;
        };
        if !sample.has_finite_position() {
            self.dropped += 1;
            tracing::debug!("Dropping gaze sample with non-finite position");
            return None;
        }

        self.window.push_back((sample.x, sample.y));
        self.sum_x += sample.x;
        self.sum_y += sample.y;
        if self.window.len() > self.config.window {
            if let Some((old_x, old_y)) = self.window.pop_front() {
                self.sum_x -= old_x;
                self.sum_y -= old_y;
            }
        }

        let ratio = features.eye_ratio();
        let blink = match ratio {
            Some(ratio) => {
                let mean = self.eye_ratio.push(ratio);
                let deviation = (ratio - mean).abs();
                self.last_deviation = Some(deviation);
                deviation > self.config.blink_deviation_threshold
            }
            None => {
                tracing::debug!("Degenerate eye geometry, reusing last eye-ratio deviation");
                self.last_deviation
                    .is_some_and(|d| d > self.config.blink_deviation_threshold)
            }
        };

        if self.window.len() < self.config.window {
            return None;
        }

        let n = self.window.len() as f64;
        Some(StabilizedSample {
            x: self.sum_x / n,
            y: self.sum_y / n,
            eye_ratio: ratio,
            blink,
        })
    }

    /// Number of raw samples currently buffered.
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// Session-long mean eye ratio, if any valid ratio has been seen.
    pub fn running_eye_ratio(&self) -> Option<f64> {
        self.eye_ratio.mean()
    }

    /// Deviation computed for the most recent valid ratio.
    pub fn last_deviation(&self) -> Option<f64> {
        self.last_deviation
    }

    /// Samples dropped as malformed.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample(x: f64, y: f64) -> RawGazeSample {
        RawGazeSample::new(x, y, 30.0, 12.0)
    }

    fn sample_with_ratio(x: f64, y: f64, ratio: f64) -> RawGazeSample {
        RawGazeSample::new(x, y, ratio * 10.0, 10.0)
    }

    fn flat_eyes(x: f64, y: f64) -> RawGazeSample {
        RawGazeSample::new(x, y, 10.0, 0.0)
    }

    #[test]
    fn test_no_output_until_window_full() {
        let mut smoother = GazeSmoother::default();
        for _ in 0..4 {
            assert!(smoother.feed(&sample(1.0, 1.0)).is_none());
        }
        assert!(smoother.feed(&sample(1.0, 1.0)).is_some());
        assert!(smoother.feed(&sample(1.0, 1.0)).is_some());
    }

    #[test]
    fn test_constant_input_is_fixed_point() {
        let mut smoother = GazeSmoother::default();
        let mut out = None;
        for _ in 0..5 {
            out = smoother.feed(&sample(10.0, 20.0));
        }
        let out = out.unwrap();
        assert_eq!(out.x, 10.0);
        assert_eq!(out.y, 20.0);
    }

    #[test]
    fn test_sliding_average_drops_oldest() {
        let mut smoother = GazeSmoother::default();
        let mut last = None;
        for x in [0.0, 10.0, 20.0, 30.0, 40.0, 50.0] {
            last = smoother.feed(&sample(x, 0.0));
        }
        let last = last.unwrap();
        assert!((last.x - 30.0).abs() < 1e-9);
        assert_eq!(smoother.window_len(), 5);
    }

    #[test]
    fn test_first_ratio_has_zero_deviation() {
        let mut smoother = GazeSmoother::default();
        smoother.feed(&sample_with_ratio(0.0, 0.0, 2.5));
        assert_eq!(smoother.running_eye_ratio(), Some(2.5));
        assert_eq!(smoother.last_deviation(), Some(0.0));
    }

    #[test]
    fn test_large_ratio_deviation_sets_blink() {
        let mut smoother = GazeSmoother::default();
        for _ in 0..5 {
            let out = smoother.feed(&sample_with_ratio(0.0, 0.0, 2.0));
            if let Some(out) = out {
                assert!(!out.blink);
            }
        }
        // mean becomes (5 * 2.0 + 2.6) / 6 = 2.1, deviation 0.5
        let out = smoother.feed(&sample_with_ratio(0.0, 0.0, 2.6)).unwrap();
        assert!(out.blink);
        assert!((smoother.last_deviation().unwrap() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_small_ratio_deviation_is_not_blink() {
        let mut smoother = GazeSmoother::default();
        for _ in 0..5 {
            smoother.feed(&sample_with_ratio(0.0, 0.0, 2.0));
        }
        let out = smoother.feed(&sample_with_ratio(0.0, 0.0, 2.3)).unwrap();
        assert!(!out.blink);
    }

    #[test]
    fn test_malformed_sample_is_dropped_without_side_effects() {
        let mut smoother = GazeSmoother::default();
        for _ in 0..4 {
            smoother.feed(&sample(5.0, 5.0));
        }
        assert!(smoother
            .feed(&RawGazeSample::without_features(500.0, 500.0))
            .is_none());
        assert!(smoother.feed(&sample(f64::NAN, 5.0)).is_none());
        assert_eq!(smoother.window_len(), 4);
        assert_eq!(smoother.dropped(), 2);

        let out = smoother.feed(&sample(5.0, 5.0)).unwrap();
        assert_eq!(out.x, 5.0);
    }

    #[test]
    fn test_zero_height_eyes_keep_position_but_skip_ratio() {
        let mut smoother = GazeSmoother::default();
        for _ in 0..5 {
            smoother.feed(&sample_with_ratio(1.0, 1.0, 2.0));
        }
        let out = smoother.feed(&flat_eyes(1.0, 1.0)).unwrap();
        assert_eq!(out.eye_ratio, None);
        assert!(!out.blink);
        assert_eq!(smoother.running_eye_ratio(), Some(2.0));
    }

    #[test]
    fn test_zero_height_eyes_repeat_previous_blink_decision() {
        let mut smoother = GazeSmoother::default();
        for _ in 0..5 {
            smoother.feed(&sample_with_ratio(0.0, 0.0, 2.0));
        }
        assert!(smoother.feed(&sample_with_ratio(0.0, 0.0, 2.6)).unwrap().blink);

        let out = smoother.feed(&flat_eyes(0.0, 0.0)).unwrap();
        assert_eq!(out.eye_ratio, None);
        assert!(out.blink);
        assert!((smoother.running_eye_ratio().unwrap() - 2.1).abs() < 1e-9);
        assert!((smoother.last_deviation().unwrap() - 0.5).abs() < 1e-9);

        // once a valid ratio arrives the decision is fresh again
        assert!(!smoother.feed(&sample_with_ratio(0.0, 0.0, 2.1)).unwrap().blink);
    }

    #[test]
    fn test_zero_height_eyes_before_any_ratio_is_not_blink() {
        let mut smoother = GazeSmoother::default();
        for _ in 0..4 {
            smoother.feed(&flat_eyes(1.0, 1.0));
        }
        let out = smoother.feed(&flat_eyes(1.0, 1.0)).unwrap();
        assert!(!out.blink);
        assert_eq!(smoother.last_deviation(), None);
        assert_eq!(smoother.running_eye_ratio(), None);
    }

    proptest! {
        #[test]
        fn prop_startup_latency_is_window(n in 0usize..40) {
            let mut smoother = GazeSmoother::default();
            let emitted = (0..n)
                .filter(|i| smoother.feed(&sample(*i as f64, 0.0)).is_some())
                .count();
            prop_assert_eq!(emitted, n.saturating_sub(4));
        }

        #[test]
        fn prop_average_stays_within_window_bounds(
            xs in proptest::collection::vec(-2000.0f64..2000.0, 5..60)
        ) {
            let mut smoother = GazeSmoother::default();
            for (i, x) in xs.iter().enumerate() {
                if let Some(out) = smoother.feed(&sample(*x, 0.0)) {
                    let recent = &xs[i + 1 - 5..=i];
                    let lo = recent.iter().cloned().fold(f64::INFINITY, f64::min);
                    let hi = recent.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                    prop_assert!(out.x >= lo - 1e-6 && out.x <= hi + 1e-6);
                }
                prop_assert!(smoother.window_len() <= 5);
            }
        }
    }
}
