//! Gazelens Page Model
//!
//! Defines the data contracts shared by the focus engine and its hosts:
//! - **Samples:** Raw gaze estimates with eye geometry, and their smoothed form
//! - **Elements:** Opaque element handles and the marker classes toggled on them
//! - **Styles:** Inline style declarations applied to focused elements
//! - **Config:** Per-tag activation time and style (the extension config)
//! - **Messages:** Fire-and-forget payloads sent to the UI surface
//!
//! Pixel coordinates are page/viewport pixels; outbound message coordinates
//! are normalized to `[0.0, 1.0]` against the viewport.

pub mod config;
pub mod element;
pub mod message;
pub mod sample;
pub mod style;

pub use config::*;
pub use element::*;
pub use message::*;
pub use sample::*;
pub use style::*;
