// Path: crates/types/src/lib.rs
#![forbid(unsafe_code)]
#![deny(missing_docs)]
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

//! # Observer Types
//!
//! The foundational library for the observer node: the report data model,
//! the error taxonomy and the configuration structures.
//!
//! ## Architectural Role
//!
//! `observer-types` has minimal dependencies and every other crate in the
//! workspace depends on it, which keeps the report structure canonical across
//! the builder, the publish sinks and the HTTP collaborators.

/// Content sampled per probe on the direct-stream path.
pub const MAX_STREAMED_BYTES: u64 = 1024 * 1024; // 1 MiB

/// A top-level, crate-wide `Result` type alias with a default error type.
pub type Result<T, E = crate::error::ObserverError> = std::result::Result<T, E>;

/// Name, ownership and gateway assessment records.
pub mod assessment;
/// Node configuration structures.
pub mod config;
/// Epoch boundaries.
pub mod epoch;
/// The observer error taxonomy.
pub mod error;
/// Gateway registrations and chain blocks.
pub mod gateway;
/// A prelude containing useful extension traits like `OptionExt`.
pub mod prelude;
/// The versioned observer report and pipeline accumulator.
pub mod report;
/// Resolution fingerprints.
pub mod resolution;

/// Opaque entropy bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Entropy(pub Vec<u8>);

impl Entropy {
    /// The raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Entropy {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
