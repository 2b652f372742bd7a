use crate::scope::ScopeFingerprint;

///
/// SyncTraceSink
///

pub trait SyncTraceSink {
    fn on_event(&self, event: SyncTraceEvent);
}

///
/// SyncTraceEvent
///
/// One engine activity. Counts are row counts within the emitting batch.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SyncTraceEvent {
    /// A completed set was served from the per-engine cache.
    CacheHit { fingerprint: ScopeFingerprint },
    /// A completed set had to be computed (or caching is disabled).
    CacheMiss { fingerprint: ScopeFingerprint },
    /// A completion pass finished.
    Completed {
        fingerprint: ScopeFingerprint,
        persisted: u64,
        synthesized: u64,
    },
    /// A payload merge replaced the dirty set.
    Merged { rows: u64, accepted: u64 },
    /// A validation pass over the dirty set finished.
    Validated { total: u64, failed: u64 },
    /// A save pass over the dirty set finished.
    SavedBatch { total: u64, failed: u64 },
}
