//! In-process adapters for the ports.
//!
//! [`MemoryStore`] backs tests, benchmarks and the demo server;
//! [`LogNotifier`] and [`RecordingNotifier`] stand in for real delivery.

mod memory;
mod notifier;

pub use memory::MemoryStore;
pub use notifier::{LogNotifier, RecordingNotifier};
