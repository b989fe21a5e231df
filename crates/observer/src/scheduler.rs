// Path: crates/observer/src/scheduler.rs
//! Decides whether a freshly built report may be published now.
//!
//! Each selected observer publishes at its own entropy-derived height inside
//! the epoch, after an early margin and before a late margin sized to the
//! deepest tolerated fork.

use observer_api::chain::HeightSource;
use observer_api::entropy::{EntropyContext, EntropySource};
use observer_api::lists::ObserverListSource;
use observer_types::error::ObserverError;
use observer_types::report::ObserverReport;
use observer_types::Result;
use std::sync::Arc;

/// The deepest chain reorganization the late margin is expected to cover.
pub const MAX_FORK_DEPTH: u64 = 50;

/// Why a cycle did not publish. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// This observer is not in the epoch's observer set.
    NotSelected,
    /// The chain has not reached this observer's publish height.
    TooEarly {
        /// The first height at which publishing is allowed.
        save_after: u64,
        /// The chain height when the decision was made.
        current_height: u64,
    },
    /// The chain is inside the late margin, or past the epoch.
    TooLate {
        /// The last height at which publishing is allowed.
        deadline: u64,
        /// The chain height when the decision was made.
        current_height: u64,
    },
}

impl SkipReason {
    /// A metrics label for the reason.
    pub fn label(&self) -> &'static str {
        match self {
            SkipReason::NotSelected => "not_selected",
            SkipReason::TooEarly { .. } => "too_early",
            SkipReason::TooLate { .. } => "too_late",
        }
    }
}

/// The scheduler's verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishDecision {
    /// Hand the report to the publish pipeline.
    Publish,
    /// Do not publish this cycle.
    Skip(SkipReason),
}

/// Epoch length and safety margins, in blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishWindow {
    block_length: u64,
    early_margin: u64,
    late_margin: u64,
}

impl PublishWindow {
    /// Rejects margins that leave no room to publish.
    pub fn new(block_length: u64, early_margin: u64, late_margin: u64) -> Result<Self> {
        if early_margin + late_margin >= block_length {
            return Err(ObserverError::InvalidInput(format!(
                "margins {early_margin}+{late_margin} leave no publish window in {block_length} blocks"
            )));
        }
        Ok(Self {
            block_length,
            early_margin,
            late_margin,
        })
    }

    /// This observer's first allowed publish height for the epoch starting at
    /// `epoch_start`, given the epoch entropy.
    pub fn save_after(&self, epoch_start: u64, entropy: &[u8]) -> u64 {
        let span = self.block_length - self.early_margin - self.late_margin;
        let jitter = match entropy {
            [a, b, c, d, ..] => u64::from(u32::from_be_bytes([*a, *b, *c, *d])) % span,
            _ => 0,
        };
        epoch_start + self.early_margin + jitter
    }

    /// The last allowed publish height for the epoch starting at `epoch_start`.
    pub fn deadline(&self, epoch_start: u64) -> u64 {
        epoch_start + self.block_length - 1 - self.late_margin
    }
}

/// Gates publishing on observer selection and the publish window.
pub struct PublishScheduler {
    observer_address: String,
    observers: Arc<dyn ObserverListSource>,
    heights: Arc<dyn HeightSource>,
    entropy: Arc<dyn EntropySource>,
    window: PublishWindow,
}

impl PublishScheduler {
    /// Builds the scheduler.
    pub fn new(
        observer_address: impl Into<String>,
        observers: Arc<dyn ObserverListSource>,
        heights: Arc<dyn HeightSource>,
        entropy: Arc<dyn EntropySource>,
        window: PublishWindow,
    ) -> Self {
        Self {
            observer_address: observer_address.into(),
            observers,
            heights,
            entropy,
            window,
        }
    }

    /// Decides whether `report` may be published now.
    pub async fn decide(&self, report: &ObserverReport) -> Result<PublishDecision> {
        let epoch = report.epoch();
        let observers = self.observers.get_observers(&epoch).await?;
        if !observers.iter().any(|o| *o == self.observer_address) {
            return Ok(PublishDecision::Skip(SkipReason::NotSelected));
        }

        let entropy = self
            .entropy
            .get_entropy(EntropyContext::at_height(epoch.start_height))
            .await?;
        let save_after = self.window.save_after(epoch.start_height, entropy.as_bytes());
        let deadline = self.window.deadline(epoch.start_height);
        let current_height = self.heights.get_height().await?;
        tracing::debug!(
            target: "scheduler",
            epoch_index = epoch.index,
            save_after,
            deadline,
            current_height,
            "evaluated publish window"
        );

        if current_height < save_after {
            return Ok(PublishDecision::Skip(SkipReason::TooEarly {
                save_after,
                current_height,
            }));
        }
        if current_height > deadline {
            return Ok(PublishDecision::Skip(SkipReason::TooLate {
                deadline,
                current_height,
            }));
        }
        Ok(PublishDecision::Publish)
    }
}
