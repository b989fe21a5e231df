// Path: crates/client/src/lists.rs
//! Lists fixed by configuration.

use async_trait::async_trait;
use observer_api::lists::{GatewayListSource, NameListSource};
use observer_types::error::ObserverError;
use observer_types::gateway::{GatewayHost, UNKNOWN_WALLET};
use observer_types::Result;

/// Gateways named in configuration. Their wallets are unknown, so their
/// ownership checks always fail.
#[derive(Debug, Clone)]
pub struct StaticGatewayList {
    hosts: Vec<GatewayHost>,
}

impl StaticGatewayList {
    /// Wraps configured FQDNs.
    pub fn new(fqdns: impl IntoIterator<Item = String>) -> Self {
        Self {
            hosts: fqdns
                .into_iter()
                .map(|fqdn| GatewayHost::new(fqdn, UNKNOWN_WALLET))
                .collect(),
        }
    }
}

#[async_trait]
impl GatewayListSource for StaticGatewayList {
    async fn get_hosts(&self) -> Result<Vec<GatewayHost>> {
        Ok(self.hosts.clone())
    }
}

/// Names named in configuration, identical at every height.
#[derive(Debug, Clone)]
pub struct StaticNameList {
    names: Vec<String>,
}

impl StaticNameList {
    /// Wraps configured names, keeping their order.
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }
}

#[async_trait]
impl NameListSource for StaticNameList {
    async fn get_names_count(&self, _height: u64) -> Result<usize> {
        Ok(self.names.len())
    }

    async fn get_name(&self, _height: u64, index: usize) -> Result<String> {
        self.names.get(index).cloned().ok_or_else(|| {
            ObserverError::InvalidInput(format!(
                "name index {index} out of range for {} names",
                self.names.len()
            ))
        })
    }

    async fn get_all_names(&self, _height: u64) -> Result<Vec<String>> {
        Ok(self.names.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_hosts_have_unknown_wallet() {
        let list = StaticGatewayList::new(vec!["a.test".to_string(), "b.test".to_string()]);
        let hosts = list.get_hosts().await.unwrap();
        assert_eq!(hosts.len(), 2);
        assert!(hosts.iter().all(|h| h.wallet == UNKNOWN_WALLET));
    }

    #[tokio::test]
    async fn test_static_names_index() {
        let list = StaticNameList::new(vec!["ardrive".into(), "arns".into()]);
        assert_eq!(list.get_names_count(0).await.unwrap(), 2);
        assert_eq!(list.get_name(9, 1).await.unwrap(), "arns");
        assert!(matches!(
            list.get_name(0, 2).await,
            Err(ObserverError::InvalidInput(_))
        ));
    }
}
