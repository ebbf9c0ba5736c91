use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::core::client::kube_resources::Pod;
use crate::core::client::mappers::map_pod_to_containers;
use crate::core::config::Config;
use crate::core::http::client::HttpClient;
use crate::domain::kubelet::{ContainerInfo, Kubelet};
use crate::errors::DiscoveryError;

pub const PODS_PATH: &str = "/pods";

/// Only the items of the kubelet's PodList are needed.
#[derive(Debug, Deserialize)]
struct PodList {
    #[serde(default)]
    items: Vec<Pod>,
}

pub struct KubeletClient {
    client: HttpClient,
    cluster_name: String,
    node_name: String,
}

impl KubeletClient {
    pub fn new(client: HttpClient, config: &Config) -> Self {
        Self {
            client,
            cluster_name: config.cluster_name.clone(),
            node_name: config.node_name.clone(),
        }
    }

    async fn pods(&self) -> Result<Vec<Pod>, DiscoveryError> {
        let body = self.client.get(PODS_PATH).await?;
        let list: PodList = serde_json::from_slice(&body).map_err(DiscoveryError::Decode)?;

        debug!("Kubelet at {} returned {} pod(s)", self.client.base_url(), list.items.len());
        Ok(list.items)
    }
}

#[async_trait]
impl Kubelet for KubeletClient {
    async fn find_containers(&self, namespaces: &[String]) -> Result<Vec<ContainerInfo>, DiscoveryError> {
        let pods = self.pods().await?;

        let containers = pods
            .iter()
            .filter(|pod| in_namespaces(pod, namespaces))
            .flat_map(|pod| map_pod_to_containers(pod, &self.cluster_name, &self.node_name))
            .collect::<Vec<_>>();

        debug!("Found {} running container(s)", containers.len());
        Ok(containers)
    }
}

fn in_namespaces(pod: &Pod, namespaces: &[String]) -> bool {
    if namespaces.is_empty() {
        return true;
    }
    let namespace = pod.metadata.namespace.as_deref().unwrap_or_default();
    namespaces.iter().any(|ns| ns == namespace)
}
