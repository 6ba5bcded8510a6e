//! Per-tag extension configuration.
//!
//! The config maps a lowercase HTML tag name to the dwell time needed
//! before focus and the inline style applied on focus:
//!
//! ```json
//! { "p": { "activationTime": 0.5, "style": { "fontSize": 18 } } }
//! ```

use std::collections::BTreeMap;
use std::fmt;

use gazelens_common::clock::{SessionClock, TimestampMs};
use gazelens_common::error::GazelensResult;
use serde::{Deserialize, Serialize};

use crate::style::ElementStyle;

/// Activation threshold and style for one tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigElement {
    /// Minimum dwell in seconds before the style applies.
    #[serde(rename = "activationTime", default)]
    pub activation_time_secs: f64,

    #[serde(default)]
    pub style: ElementStyle,
}

impl ConfigElement {
    pub fn new(activation_time_secs: f64, style: ElementStyle) -> Self {
        Self {
            activation_time_secs,
            style,
        }
    }

    /// Activation time in milliseconds (negative or non-finite means immediate).
    pub fn activation_ms(&self) -> TimestampMs {
        SessionClock::secs_to_ms(self.activation_time_secs)
    }
}

/// Tag name -> [`ConfigElement`]. Tags are stored lowercase.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, ConfigElement>", into = "BTreeMap<String, ConfigElement>")]
pub struct ExtensionConfig {
    tags: BTreeMap<String, ConfigElement>,

    /// Source keys that lowercased onto the same tag, kept for `validate`.
    case_collisions: BTreeMap<String, Vec<String>>,
}

impl From<BTreeMap<String, ConfigElement>> for ExtensionConfig {
    /// Keys are visited in sorted order, so the last spelling wins (`"div"`
    /// over `"DIV"`).
    fn from(raw: BTreeMap<String, ConfigElement>) -> Self {
        let mut spellings: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut tags = BTreeMap::new();
        for (key, element) in raw {
            let tag = key.to_ascii_lowercase();
            spellings.entry(tag.clone()).or_default().push(key);
            tags.insert(tag, element);
        }
        spellings.retain(|_, keys| keys.len() > 1);
        Self {
            tags,
            case_collisions: spellings,
        }
    }
}

impl From<ExtensionConfig> for BTreeMap<String, ConfigElement> {
    fn from(config: ExtensionConfig) -> Self {
        config.tags
    }
}

/// A problem found while validating a config.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigIssue {
    /// Tag key is empty or contains whitespace.
    InvalidTag { tag: String },
    /// Activation time is NaN or infinite.
    NonFiniteActivation { tag: String },
    /// Activation time is below zero.
    NegativeActivation { tag: String, secs: f64 },
    /// Style has no declarations, so focus would be invisible.
    EmptyStyle { tag: String },
    /// Several keys differ only by case; only the last one was kept.
    DuplicateTag { tag: String, keys: Vec<String> },
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTag { tag } => write!(f, "invalid tag name {tag:?}"),
            Self::NonFiniteActivation { tag } => {
                write!(f, "<{tag}>: activationTime is not a finite number")
            }
            Self::NegativeActivation { tag, secs } => {
                write!(f, "<{tag}>: activationTime {secs} is negative")
            }
            Self::EmptyStyle { tag } => write!(f, "<{tag}>: style is empty"),
            Self::DuplicateTag { tag, keys } => {
                write!(f, "<{tag}>: keys {} differ only by case", keys.join(", "))
            }
        }
    }
}

impl ExtensionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from JSON text.
    pub fn from_json(json: &str) -> GazelensResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to pretty JSON.
    pub fn to_json_pretty(&self) -> GazelensResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The profile a fresh install starts with.
    pub fn builtin() -> Self {
        Self::new()
            .with_tag(
                "div",
                ConfigElement::new(
                    1.0,
                    ElementStyle::new()
                        .with("scale", 1.2)
                        .with("color", "#000000")
                        .with("backgroundColor", "#FFFFFF"),
                ),
            )
            .with_tag(
                "p",
                ConfigElement::new(
                    0.5,
                    ElementStyle::new()
                        .with("fontSize", 16.0)
                        .with("color", "#000000")
                        .with("backgroundColor", "#FFFFFF"),
                ),
            )
    }

    /// Builder-style insert.
    pub fn with_tag(mut self, tag: &str, element: ConfigElement) -> Self {
        self.insert(tag, element);
        self
    }

    /// Insert or replace the entry for a tag.
    pub fn insert(&mut self, tag: &str, element: ConfigElement) -> Option<ConfigElement> {
        let tag = tag.to_ascii_lowercase();
        self.case_collisions.remove(&tag);
        self.tags.insert(tag, element)
    }

    pub fn remove(&mut self, tag: &str) -> Option<ConfigElement> {
        let tag = tag.to_ascii_lowercase();
        self.case_collisions.remove(&tag);
        self.tags.remove(&tag)
    }

    /// Look up a tag, case-insensitively.
    pub fn get(&self, tag: &str) -> Option<&ConfigElement> {
        match self.tags.get(tag) {
            Some(element) => Some(element),
            None => self.tags.get(&tag.to_ascii_lowercase()),
        }
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Check every entry and collect problems.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues: Vec<ConfigIssue> = self
            .case_collisions
            .iter()
            .map(|(tag, keys)| ConfigIssue::DuplicateTag {
                tag: tag.clone(),
                keys: keys.clone(),
            })
            .collect();
        for (tag, element) in &self.tags {
            if tag.is_empty() || tag.chars().any(char::is_whitespace) {
                issues.push(ConfigIssue::InvalidTag { tag: tag.clone() });
            }
            let secs = element.activation_time_secs;
            if !secs.is_finite() {
                issues.push(ConfigIssue::NonFiniteActivation { tag: tag.clone() });
            } else if secs < 0.0 {
                issues.push(ConfigIssue::NegativeActivation {
                    tag: tag.clone(),
                    secs,
                });
            }
            if element.style.is_empty() {
                issues.push(ConfigIssue::EmptyStyle { tag: tag.clone() });
            }
        }
        issues
    }
}
