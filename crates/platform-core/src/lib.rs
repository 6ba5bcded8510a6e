//! Gazelens platform core contracts.
//!
//! The focus engine never talks to a browser directly. It drives the host
//! through the narrow capabilities defined here:
//! - [`Page`]: hit-testing, inline style and class mutation, liveness
//! - [`Scheduler`]: one-shot timers that call back into the engine
//! - [`MessageSink`]: fire-and-forget delivery to the UI surface

use gazelens_common::error::GazelensResult;
use gazelens_page_model::element::ElementId;
use gazelens_page_model::message::OutboundMessage;
use serde::{Deserialize, Serialize};

/// Size of the visible page area in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportSize {
    pub width: f64,
    pub height: f64,
}

impl ViewportSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Default for ViewportSize {
    fn default() -> Self {
        Self::new(1920.0, 1080.0)
    }
}

/// Normalize page pixel coordinates to `[0.0, 1.0]` for a viewport.
///
/// A zero or non-finite viewport dimension maps that axis to `0.0`.
pub fn normalize_coords(x: f64, y: f64, viewport: ViewportSize) -> (f64, f64) {
    (normalize_axis(x, viewport.width), normalize_axis(y, viewport.height))
}

fn normalize_axis(value: f64, extent: f64) -> f64 {
    if !extent.is_finite() || extent <= 0.0 || !value.is_finite() {
        return 0.0;
    }
    (value / extent).clamp(0.0, 1.0)
}

/// Host page capabilities used by the engine.
///
/// Every mutating call on an element that is no longer connected must be a
/// silent no-op.
pub trait Page {
    /// Topmost element at the given page coordinate.
    fn element_at(&self, x: f64, y: f64) -> Option<ElementId>;

    /// Tag name of an element, if it still exists.
    fn tag_name(&self, element: ElementId) -> Option<String>;

    /// Whether the element is still attached to the document.
    fn is_connected(&self, element: ElementId) -> bool;

    /// Current inline value of a style property. Empty means unset.
    fn style_property(&self, element: ElementId, property: &str) -> Option<String>;

    fn set_style_property(&mut self, element: ElementId, property: &str, value: &str);

    fn remove_style_property(&mut self, element: ElementId, property: &str);

    fn add_class(&mut self, element: ElementId, class: &str);

    fn remove_class(&mut self, element: ElementId, class: &str);

    /// Current viewport size.
    fn viewport(&self) -> ViewportSize;

    /// Whether the hosting context is still valid (not navigated away/unloaded).
    fn is_live(&self) -> bool;

    /// Move the gaze marker overlay to a page coordinate.
    fn place_gaze_marker(&mut self, _x: f64, _y: f64) {}

    /// Show or hide diagnostic overlays (gaze marker, camera preview).
    fn set_diagnostics_visible(&mut self, _visible: bool) {}
}

/// Work the engine schedules for later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerTask {
    /// Remove the `unfocusing` marker once the transition has played.
    ///
    /// `generation` lets a newer unfocus of the same element supersede this one.
    ClearUnfocusing { element: ElementId, generation: u64 },
}

/// One-shot timer capability (`ScheduleAfter(ms, task)`).
///
/// The host hands due tasks back to the engine; the engine checks liveness
/// before acting on them.
pub trait Scheduler {
    fn schedule_after(&mut self, delay_ms: u64, task: TimerTask);
}

/// Fire-and-forget channel to the UI surface.
pub trait MessageSink {
    /// Deliver a message. An error means nobody is listening.
    fn send(&mut self, message: &OutboundMessage) -> GazelensResult<()>;
}
