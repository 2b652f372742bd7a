//! Observability: trace sink abstractions for engine activity.
//!
//! Tracing is optional, injected by the caller, and must not affect
//! completion or synchronization semantics.

mod trace;

pub use trace::{SyncTraceEvent, SyncTraceSink};

#[cfg(test)]
pub(crate) use trace::test_sink::RecordingSink;
