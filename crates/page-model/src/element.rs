//! Element handles and lifecycle markers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque, non-owning handle to a page element.
///
/// Holding an id never keeps the element alive; the page decides whether
/// an id still refers to a connected element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "el#{}", self.0)
    }
}

/// Classes toggled on elements so a stylesheet can render each state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerClass {
    /// Recently gazed at (debug mode only).
    Dwelling,
    /// Focus style applied.
    Focused,
    /// Style reverted, transition out in progress.
    Unfocusing,
}

impl MarkerClass {
    /// Class name as it appears on the element.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dwelling => "dwelling",
            Self::Focused => "focused",
            Self::Unfocusing => "unfocusing",
        }
    }

    /// Parse a marker from its class name.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "dwelling" => Some(Self::Dwelling),
            "focused" => Some(Self::Focused),
            "unfocusing" => Some(Self::Unfocusing),
            _ => None,
        }
    }
}

/// Lifecycle of an element as seen by the focus engine.
///
/// `Unseen -> Dwelling -> Focused -> Unfocusing -> (forgotten)`, with
/// `Dwelling -> (forgotten)` on expiry before activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementState {
    Unseen,
    Dwelling,
    Focused,
    Unfocusing,
}
