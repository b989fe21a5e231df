// Path: crates/types/src/prelude.rs

//! Commonly used types and extension traits.

pub use crate::epoch::Epoch;
pub use crate::error::{ErrorCode, ObserverError};
pub use crate::Result;

/// An extension trait for `Option` that turns an absent upstream field into an
/// `ObserverError::UpstreamUnavailable`.
pub trait OptionExt<T> {
    /// Returns the contained value, or an `UpstreamUnavailable` error naming
    /// the missing `what`.
    fn or_upstream(self, what: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_upstream(self, what: &str) -> Result<T> {
        self.ok_or_else(|| ObserverError::UpstreamUnavailable(format!("missing {what}")))
    }
}
