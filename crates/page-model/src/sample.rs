//! Gaze sample types.
//!
//! Raw samples arrive from the external gaze estimator at an irregular rate
//! (typically 15-60 Hz). Recorded sessions are stored as JSONL, one
//! [`TimedGazeSample`] per line, with `#`-prefixed comment lines allowed.

use std::path::Path;

use gazelens_common::clock::TimestampMs;
use gazelens_common::error::{GazelensError, GazelensResult};
use serde::{Deserialize, Serialize};

/// Bounding box of one detected eye region.
///
/// The estimator also ships an image patch and its position; this model
/// keeps only the dimensions and ignores the rest when deserializing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EyeRect {
    pub width: f64,
    pub height: f64,
}

/// Geometry of both detected eyes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EyeFeatures {
    pub left: EyeRect,
    pub right: EyeRect,
}

impl EyeFeatures {
    /// Combined width-to-height ratio of both eye regions.
    ///
    /// Returns `None` for degenerate geometry (zero or non-finite sums).
    pub fn eye_ratio(&self) -> Option<f64> {
        let width = self.left.width + self.right.width;
        let height = self.left.height + self.right.height;
        if !width.is_finite() || !height.is_finite() || height == 0.0 {
            return None;
        }
        let ratio = width / height;
        ratio.is_finite().then_some(ratio)
    }
}

/// One raw gaze estimate in page pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawGazeSample {
    pub x: f64,
    pub y: f64,

    /// Eye geometry. Samples without it are malformed and get dropped.
    #[serde(
        rename = "eyeFeatures",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub eye_features: Option<EyeFeatures>,
}

impl RawGazeSample {
    /// Create a sample with symmetric eye regions of the given size.
    pub fn new(x: f64, y: f64, eye_width: f64, eye_height: f64) -> Self {
        let eye = EyeRect {
            width: eye_width,
            height: eye_height,
        };
        Self {
            x,
            y,
            eye_features: Some(EyeFeatures {
                left: eye,
                right: eye,
            }),
        }
    }

    /// Create a sample that carries no eye geometry.
    pub fn without_features(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            eye_features: None,
        }
    }

    /// Whether the coordinate is usable at all.
    pub fn has_finite_position(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// A raw sample stamped with its arrival time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedGazeSample {
    /// Milliseconds since session start.
    #[serde(rename = "t")]
    pub timestamp_ms: TimestampMs,

    #[serde(flatten)]
    pub sample: RawGazeSample,
}

impl TimedGazeSample {
    pub fn new(timestamp_ms: TimestampMs, sample: RawGazeSample) -> Self {
        Self {
            timestamp_ms,
            sample,
        }
    }
}

/// Output of the smoother: a moving-average coordinate plus the eye signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StabilizedSample {
    pub x: f64,
    pub y: f64,

    /// Eye ratio of the newest sample, absent for degenerate geometry.
    pub eye_ratio: Option<f64>,

    /// Eye-geometry anomaly flag (deviation from the running average).
    pub blink: bool,
}

/// Parse timed samples from JSONL content (one JSON object per line).
pub fn parse_samples(jsonl: &str) -> Result<Vec<TimedGazeSample>, serde_json::Error> {
    jsonl
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(serde_json::from_str)
        .collect()
}

/// Load timed samples from a JSONL file, naming the offending line on error.
pub fn load_samples(path: &Path) -> GazelensResult<Vec<TimedGazeSample>> {
    if !path.exists() {
        return Err(GazelensError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    content
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(line_no, line)| {
            serde_json::from_str(line).map_err(|e| {
                GazelensError::sample(format!("{}:{line_no}: {e}", path.display()))
            })
        })
        .collect()
}

/// Serialize timed samples to JSONL format.
pub fn serialize_samples(samples: &[TimedGazeSample]) -> Result<String, serde_json::Error> {
    let mut output = String::new();
    for sample in samples {
        output.push_str(&serde_json::to_string(sample)?);
        output.push('\n');
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eye_ratio() {
        let sample = RawGazeSample::new(0.0, 0.0, 30.0, 10.0);
        let ratio = sample.eye_features.unwrap().eye_ratio().unwrap();
        assert!((ratio - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_eye_ratio_degenerate_height() {
        let features = EyeFeatures {
            left: EyeRect {
                width: 10.0,
                height: 0.0,
            },
            right: EyeRect {
                width: 12.0,
                height: 0.0,
            },
        };
        assert_eq!(features.eye_ratio(), None);
    }

    #[test]
    fn test_parses_estimator_payload_with_extra_fields() {
        let line = r#"{"t":16,"x":412.5,"y":300.0,"eyeFeatures":{"left":{"patch":{},"imagex":10,"imagey":12,"width":30,"height":12},"right":{"patch":{},"imagex":50,"imagey":12,"width":32,"height":12}},"all":[]}"#;
        let parsed = parse_samples(line).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].timestamp_ms, 16);
        let features = parsed[0].sample.eye_features.unwrap();
        assert_eq!(features.right.width, 32.0);
    }

    #[test]
    fn test_missing_eye_features_is_none() {
        let parsed = parse_samples("# header\n{\"t\":0,\"x\":1.0,\"y\":2.0}\n").unwrap();
        assert_eq!(parsed.len(), 1);
        assert!(parsed[0].sample.eye_features.is_none());
    }

    #[test]
    fn test_jsonl_roundtrip() {
        let samples = vec![
            TimedGazeSample::new(0, RawGazeSample::new(10.0, 20.0, 30.0, 12.0)),
            TimedGazeSample::new(33, RawGazeSample::without_features(11.0, 21.0)),
        ];
        let jsonl = serialize_samples(&samples).unwrap();
        assert_eq!(parse_samples(&jsonl).unwrap(), samples);
    }

    #[test]
    fn test_non_finite_position() {
        assert!(!RawGazeSample::without_features(f64::NAN, 1.0).has_finite_position());
        assert!(RawGazeSample::without_features(0.0, 1.0).has_finite_position());
    }

    #[test]
    fn test_load_samples_names_bad_line() {
        let path = std::env::temp_dir().join(format!(
            "gazelens-bad-samples-{}.jsonl",
            std::process::id()
        ));
        std::fs::write(&path, "# session\n{\"t\":0,\"x\":1,\"y\":2}\n{\"t\":33}\n").unwrap();
        let err = load_samples(&path).unwrap_err();
        std::fs::remove_file(&path).ok();

        assert!(matches!(err, GazelensError::Sample { .. }));
        assert!(err.to_string().contains(":3:"));
    }

    #[test]
    fn test_load_samples_missing_file() {
        let err = load_samples(Path::new("/nonexistent/gazelens/samples.jsonl")).unwrap_err();
        assert!(matches!(err, GazelensError::FileNotFound { .. }));
    }
}
