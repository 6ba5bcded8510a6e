//! Inline style declarations.
//!
//! Configs may spell properties in camelCase (`fontSize`) and give numbers
//! instead of strings (`16`). Both are normalized to CSS text here so the
//! page layer only ever sees `font-size: 16px`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Properties whose numeric values carry no unit.
const UNITLESS_PROPERTIES: &[&str] = &[
    "opacity",
    "scale",
    "z-index",
    "font-weight",
    "line-height",
    "zoom",
    "flex-grow",
    "flex-shrink",
    "order",
];

/// A single style value as written in a config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StyleValue {
    Number(f64),
    Text(String),
}

impl StyleValue {
    /// Render the value as CSS text for the given (CSS-named) property.
    pub fn to_css(&self, property: &str) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Number(n) if UNITLESS_PROPERTIES.contains(&property) => format!("{n}"),
            Self::Number(n) => format!("{n}px"),
        }
    }
}

impl From<&str> for StyleValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for StyleValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for StyleValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// A set of inline style declarations keyed by property name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementStyle(BTreeMap<String, StyleValue>);

impl ElementStyle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, property: impl Into<String>, value: impl Into<StyleValue>) -> Self {
        self.insert(property, value);
        self
    }

    pub fn insert(&mut self, property: impl Into<String>, value: impl Into<StyleValue>) {
        self.0.insert(property.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Declarations as `(css-property, css-value)` pairs.
    pub fn declarations(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(raw, value)| {
                let property = css_property_name(raw);
                let css = value.to_css(&property);
                (property, css)
            })
            .collect()
    }

    /// CSS property names touched by this style.
    pub fn properties(&self) -> Vec<String> {
        self.0.keys().map(|raw| css_property_name(raw)).collect()
    }
}

/// Convert a camelCase property name to its CSS spelling.
///
/// Names that already contain a dash (including custom `--vars`) pass
/// through unchanged.
pub fn css_property_name(raw: &str) -> String {
    if raw.contains('-') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len() + 4);
    for ch in raw.chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
