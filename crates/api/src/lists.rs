// Path: crates/api/src/lists.rs

use async_trait::async_trait;
use observer_types::epoch::Epoch;
use observer_types::gateway::GatewayHost;
use observer_types::Result;

/// Provides the gateways to observe.
#[async_trait]
pub trait GatewayListSource: Send + Sync {
    /// Returns every registration. FQDNs may repeat.
    async fn get_hosts(&self) -> Result<Vec<GatewayHost>>;
}

/// An ordered, height-indexed universe of names to sample from.
#[async_trait]
pub trait NameListSource: Send + Sync {
    /// The number of names registered at `height`.
    async fn get_names_count(&self, height: u64) -> Result<usize>;

    /// The name at `index` in the stable ordering at `height`.
    async fn get_name(&self, height: u64, index: usize) -> Result<String>;

    /// Every name registered at `height`, in the stable ordering.
    async fn get_all_names(&self, height: u64) -> Result<Vec<String>>;
}

/// Produces the names an observer checks during `epoch`.
#[async_trait]
pub trait NamesSource: Send + Sync {
    /// Returns the names for `epoch`.
    async fn get_names(&self, epoch: &Epoch) -> Result<Vec<String>>;
}

/// Produces the observers selected for an epoch.
#[async_trait]
pub trait ObserverListSource: Send + Sync {
    /// Returns the wallet addresses selected to observe during `epoch`.
    async fn get_observers(&self, epoch: &Epoch) -> Result<Vec<String>>;
}
