//! Update pipeline - port allocation, the per-container state machine and
//! batch dispatch

pub mod allocator;
pub mod dispatcher;
pub mod orchestrator;

pub use dispatcher::{BatchReport, Dispatcher};
pub use orchestrator::{UpdateOutcome, UpdateStage};
