// Path: crates/observer/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! # Observer Core
//!
//! The engine of the observer node: entropy and deterministic sampling, epoch
//! resolution, HTTP probing and gateway assessment, report assembly, the
//! publish scheduler and the report pipeline. Everything outside the process
//! is reached through the traits in `observer-api`.

/// Per-gateway ownership and name assessment.
pub mod assessor;
/// The periodic report cycle.
pub mod driver;
/// Chain, random, cached and composite entropy sources.
pub mod entropy;
/// Epoch boundary resolution.
pub mod epochs;
/// Report sinks and the pipeline that chains them.
pub mod pipeline;
/// HTTP resolution prober.
pub mod prober;
/// Report assembly.
pub mod report;
/// Bounded retries.
pub mod retry;
/// Entropy-driven index and byte-range selection.
pub mod sampler;
/// Publish window and observer eligibility.
pub mod scheduler;
/// Entropy-selected names and observers.
pub mod selection;

use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the UNIX epoch.
pub(crate) fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Cuts `s` to at most `max` bytes without splitting a character.
pub(crate) fn truncate_utf8(s: &str, max: usize) -> String {
    let mut end = s.len().min(max);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.get(..end).unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_utf8("hello", 10), "hello");
        assert_eq!(truncate_utf8("hello", 3), "hel");
        // 'é' is two bytes; cutting inside it backs off to the previous boundary.
        assert_eq!(truncate_utf8("aé", 2), "a");
    }
}
