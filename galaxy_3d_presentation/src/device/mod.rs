/// Device module - queues and GPU synchronization handles

pub mod device;
pub mod sync;

pub use device::*;
pub use sync::*;

#[cfg(test)]
#[path = "device_tests.rs"]
mod tests;
