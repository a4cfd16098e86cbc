//! Login throttling keyed by normalized identity and client address.
//!
//! [`RateLimiter`] is a keyed counter store: each key maps to an attempt
//! count and the instant its decay window opened. A counter is created on
//! first hit, incremented on every failed login, cleared on success and
//! forgotten once its window elapses, whatever the outcome.

use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Builds the rate-limit bucket for a login attempt.
///
/// The identity is transliterated (compatibility forms folded, combining
/// marks stripped) and then lower-cased, so that visually equivalent
/// spellings share one bucket.
pub fn throttle_key(identity: &str, client_addr: &str) -> String {
    format!("{}|{client_addr}", transliterate(identity).to_lowercase())
}

fn transliterate(s: &str) -> String {
    s.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

#[derive(Debug, Clone, Copy)]
struct Counter {
    attempts: u32,
    window_start: Instant,
}

/// Per-key attempt counters with a fixed decay window.
///
/// Increments for one key are serialized by the map's shard lock; distinct
/// keys never contend beyond sharing a shard.
pub struct RateLimiter {
    counters: DashMap<String, Counter>,
    decay: Duration,
}

impl RateLimiter {
    pub fn new(decay: Duration) -> Self {
        Self {
            counters: DashMap::new(),
            decay,
        }
    }

    /// Returns `true` if `key` has reached `max_attempts` inside its live window.
    pub fn too_many_attempts(&self, key: &str, max_attempts: u32) -> bool {
        self.attempts(key) >= max_attempts
    }

    /// Records one attempt and returns the new count for the window.
    pub fn hit(&self, key: &str) -> u32 {
        let now = Instant::now();
        let mut entry = self
            .counters
            .entry(key.to_string())
            .or_insert(Counter {
                attempts: 0,
                window_start: now,
            });
        if now.duration_since(entry.window_start) >= self.decay {
            entry.attempts = 0;
            entry.window_start = now;
        }
        entry.attempts = entry.attempts.saturating_add(1);
        entry.attempts
    }

    /// Reserves one attempt for `key` unless it is already at `max_attempts`.
    ///
    /// The check and the increment happen under the same entry lock, so no
    /// number of concurrent callers can push a window past `max_attempts`.
    /// Returns the new count, or the seconds until the window closes when
    /// the key is locked out.
    pub fn try_acquire(&self, key: &str, max_attempts: u32) -> Result<u32, u64> {
        let now = Instant::now();
        let mut entry = self
            .counters
            .entry(key.to_string())
            .or_insert(Counter {
                attempts: 0,
                window_start: now,
            });
        let elapsed = now.duration_since(entry.window_start);
        if elapsed >= self.decay {
            entry.attempts = 0;
            entry.window_start = now;
        } else if entry.attempts >= max_attempts {
            return Err(ceil_secs(self.decay - elapsed));
        }
        entry.attempts = entry.attempts.saturating_add(1);
        Ok(entry.attempts)
    }

    /// Hands back an attempt reserved by [`try_acquire`](Self::try_acquire).
    /// A counter that drops to zero is forgotten.
    pub fn release(&self, key: &str) {
        self.counters.remove_if_mut(key, |_, c| {
            c.attempts = c.attempts.saturating_sub(1);
            c.attempts == 0
        });
    }

    /// Attempts recorded for `key` in the current window. Expired counters read as zero.
    pub fn attempts(&self, key: &str) -> u32 {
        let Some(entry) = self.counters.get(key) else {
            return 0;
        };
        if entry.window_start.elapsed() >= self.decay {
            drop(entry);
            self.counters
                .remove_if(key, |_, c| c.window_start.elapsed() >= self.decay);
            return 0;
        }
        entry.attempts
    }

    /// Seconds until the window for `key` closes, rounded up. Zero when no live counter exists.
    pub fn available_in(&self, key: &str) -> u64 {
        let Some(entry) = self.counters.get(key) else {
            return 0;
        };
        let remaining = self.decay.saturating_sub(entry.window_start.elapsed());
        ceil_secs(remaining)
    }

    /// Forgets the counter for `key`. Clearing an absent key is a no-op.
    pub fn clear(&self, key: &str) {
        self.counters.remove(key);
    }

    /// Drops every counter whose window has elapsed. Returns how many were removed.
    pub fn prune_expired(&self) -> usize {
        let before = self.counters.len();
        let decay = self.decay;
        self.counters
            .retain(|_, c| c.window_start.elapsed() < decay);
        let removed = before.saturating_sub(self.counters.len());
        if removed > 0 {
            tracing::debug!("Pruned {removed} expired throttle counters");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}

fn ceil_secs(d: Duration) -> u64 {
    let secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

/// Whole minutes for display, rounded up.
pub fn minutes_for_display(seconds: u64) -> u64 {
    seconds.div_ceil(60)
}
