//! Gazelens page simulator.
//!
//! Stand-ins for the browser capabilities so the focus engine can run in
//! tests and in the CLI replay tool:
//! - [`MemoryPage`]: a flat box layout with inline styles and classes
//! - [`ManualScheduler`]: timers that fire only when virtual time advances
//! - [`RecordingSink`]: keeps every outbound message, can play "no listener"

pub mod page;
pub mod scheduler;
pub mod sink;

pub use page::{BoxSpec, MemoryPage, PageLayout};
pub use scheduler::ManualScheduler;
pub use sink::RecordingSink;
