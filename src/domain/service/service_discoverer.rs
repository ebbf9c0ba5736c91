use async_trait::async_trait;
use kube::Client;
use tracing::debug;

use crate::core::client::mappers::map_service_to_info;
use crate::core::client::services::list_services;
use crate::core::config::Config;
use crate::domain::service::{ServiceDiscoverer, ServiceInfo};
use crate::errors::DiscoveryError;

/// Lists services straight from the API server.
pub struct KubeServiceDiscoverer {
    client: Client,
    cluster_name: String,
}

impl KubeServiceDiscoverer {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            cluster_name: config.cluster_name.clone(),
        }
    }
}

#[async_trait]
impl ServiceDiscoverer for KubeServiceDiscoverer {
    async fn find_services(&self, namespaces: &[String]) -> Result<Vec<ServiceInfo>, DiscoveryError> {
        let services = if namespaces.is_empty() {
            list_services(&self.client, None)
                .await
                .map_err(DiscoveryError::ListServices)?
        } else {
            let mut all = Vec::new();
            for namespace in namespaces {
                let services = list_services(&self.client, Some(namespace.as_str()))
                    .await
                    .map_err(|source| DiscoveryError::ListNamespacedServices {
                        namespace: namespace.clone(),
                        source,
                    })?;
                all.extend(services);
            }
            all
        };

        debug!("Found {} service(s)", services.len());
        Ok(services
            .iter()
            .map(|svc| map_service_to_info(svc, &self.cluster_name))
            .collect())
    }
}
