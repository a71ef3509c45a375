//! Single-thread loop: typed event channel and timer queue

mod event;
#[allow(clippy::module_inception)]
mod looper;

pub use event::{EngineEvent, TimerId, TimerKind};
pub use looper::{Looper, LoopProxy};

#[cfg(test)]
#[path = "looper_tests.rs"]
mod tests;
