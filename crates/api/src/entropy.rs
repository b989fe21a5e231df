// Path: crates/api/src/entropy.rs

use async_trait::async_trait;
use observer_types::{Entropy, Result};

/// Parameters an entropy source may bind its output to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntropyContext {
    /// The chain height to derive entropy at. Sources that are not chain
    /// bound ignore it; chain-bound sources fall back to the current height.
    pub height: Option<u64>,
}

impl EntropyContext {
    /// A context pinned to `height`.
    pub fn at_height(height: u64) -> Self {
        Self {
            height: Some(height),
        }
    }
}

/// Produces unpredictable bytes, optionally tied to chain state.
#[async_trait]
pub trait EntropySource: Send + Sync {
    /// Returns entropy for `context`.
    async fn get_entropy(&self, context: EntropyContext) -> Result<Entropy>;
}
