//! Process-wide success/failure tally.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Events counted by [`Counters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tally {
    AudioOk,
    AudioFail,
    CoverOk,
    CoverFail,
    /// A cover header variant exhausted its whole retry budget.
    CoverRetry,
}

/// Aggregate counters shared by all running pipelines.
///
/// Fields are private; tasks only increment through [`Counters::record`].
#[derive(Debug, Default)]
pub struct Counters {
    audio_ok: AtomicU64,
    audio_fail: AtomicU64,
    cover_ok: AtomicU64,
    cover_fail: AtomicU64,
    cover_retries: AtomicU64,
    cover_repaired: AtomicU64,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: Tally) {
        let counter = match event {
            Tally::AudioOk => &self.audio_ok,
            Tally::AudioFail => &self.audio_fail,
            Tally::CoverOk => &self.cover_ok,
            Tally::CoverFail => &self.cover_fail,
            Tally::CoverRetry => &self.cover_retries,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// A cover missing after the main pass was embedded by the repair pass.
    pub fn record_cover_repaired(&self) {
        self.cover_ok.fetch_add(1, Ordering::Relaxed);
        // Saturating: a repair is only attempted for a counted failure.
        let _ = self
            .cover_fail
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                Some(v.saturating_sub(1))
            });
        self.cover_repaired.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            audio_ok: self.audio_ok.load(Ordering::Relaxed),
            audio_fail: self.audio_fail.load(Ordering::Relaxed),
            cover_ok: self.cover_ok.load(Ordering::Relaxed),
            cover_fail: self.cover_fail.load(Ordering::Relaxed),
            cover_retries: self.cover_retries.load(Ordering::Relaxed),
            cover_repaired: self.cover_repaired.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`Counters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CountersSnapshot {
    pub audio_ok: u64,
    pub audio_fail: u64,
    pub cover_ok: u64,
    pub cover_fail: u64,
    pub cover_retries: u64,
    pub cover_repaired: u64,
}

impl fmt::Display for CountersSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "audio {} ok / {} failed, cover {} ok / {} failed ({} retries, {} repaired)",
            self.audio_ok,
            self.audio_fail,
            self.cover_ok,
            self.cover_fail,
            self.cover_retries,
            self.cover_repaired
        )
    }
}
