// src/session/transcript.rs
use std::collections::HashSet;

/// Per-session render state: the watermark (highest message id already
/// incorporated into the visible transcript) and the dedup registry (ids
/// already rendered). Owned exclusively by the session coordinator; the
/// poller never touches it, it only publishes candidates over its channel.
///
/// The two are kept separate on purpose. The watermark is a ceiling used
/// for incremental fetches; the registry is a membership test, and stays
/// meaningful when a clear invalidates history without moving the ceiling.
#[derive(Debug, Default)]
pub struct Transcript {
    watermark: i64,
    seen: HashSet<i64>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn watermark(&self) -> i64 {
        self.watermark
    }

    /// The atomic render decision: returns true exactly once per id over
    /// the life of the session (until `reset_seen`), and advances the
    /// watermark whether or not the id gets rendered.
    pub fn observe(&mut self, id: i64) -> bool {
        self.watermark = self.watermark.max(id);
        self.seen.insert(id)
    }

    /// Forget rendered ids after a conversation clear. The watermark stays
    /// where it is: message ids are never reused, so a monotone ceiling
    /// cannot suppress a legitimate future row.
    pub fn reset_seen(&mut self) {
        self.seen.clear();
    }

    #[cfg(test)]
    pub fn seen_len(&self) -> usize {
        self.seen.len()
    }
}
