// Path: crates/observer/src/selection.rs
//! Entropy-driven name and observer selection for an epoch.

use crate::sampler::select_k;
use async_trait::async_trait;
use futures::future::try_join_all;
use observer_api::entropy::{EntropyContext, EntropySource};
use observer_api::lists::{GatewayListSource, NameListSource, NamesSource, ObserverListSource};
use observer_types::epoch::Epoch;
use observer_types::Result;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Samples names from a [`NameListSource`] at the epoch start height.
pub struct RandomNamesSource {
    names: Arc<dyn NameListSource>,
    entropy: Arc<dyn EntropySource>,
    count: usize,
}

impl RandomNamesSource {
    /// Samples `count` names per epoch using `entropy`.
    pub fn new(
        names: Arc<dyn NameListSource>,
        entropy: Arc<dyn EntropySource>,
        count: usize,
    ) -> Self {
        Self {
            names,
            entropy,
            count,
        }
    }
}

#[async_trait]
impl NamesSource for RandomNamesSource {
    async fn get_names(&self, epoch: &Epoch) -> Result<Vec<String>> {
        let height = epoch.start_height;
        let total = self.names.get_names_count(height).await?;
        if self.count >= total {
            return self.names.get_all_names(height).await;
        }

        let entropy = self
            .entropy
            .get_entropy(EntropyContext::at_height(height))
            .await?;
        let indices = select_k(entropy.as_bytes(), total, self.count);
        try_join_all(indices.into_iter().map(|i| self.names.get_name(height, i))).await
    }
}

/// Samples observers from the wallets of gateways active at the epoch start.
///
/// Used when no ledger publishes the observer selection.
pub struct RandomObserversSource {
    gateways: Arc<dyn GatewayListSource>,
    entropy: Arc<dyn EntropySource>,
    count: usize,
}

impl RandomObserversSource {
    /// Samples `count` observers per epoch using `entropy`.
    pub fn new(
        gateways: Arc<dyn GatewayListSource>,
        entropy: Arc<dyn EntropySource>,
        count: usize,
    ) -> Self {
        Self {
            gateways,
            entropy,
            count,
        }
    }
}

#[async_trait]
impl ObserverListSource for RandomObserversSource {
    async fn get_observers(&self, epoch: &Epoch) -> Result<Vec<String>> {
        let height = epoch.start_height;
        let wallets: Vec<String> = self
            .gateways
            .get_hosts()
            .await?
            .into_iter()
            .filter(|host| host.is_active_at(height))
            .map(|host| host.wallet)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if self.count >= wallets.len() {
            return Ok(wallets);
        }

        let entropy = self
            .entropy
            .get_entropy(EntropyContext::at_height(height))
            .await?;
        Ok(select_k(entropy.as_bytes(), wallets.len(), self.count)
            .into_iter()
            .filter_map(|i| wallets.get(i).cloned())
            .collect())
    }
}
