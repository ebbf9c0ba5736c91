//! Container discovery through the kubelet `/pods` endpoint.

pub mod container_info;
pub mod kubelet_client;

use async_trait::async_trait;

use crate::errors::DiscoveryError;

pub use container_info::{ContainerInfo, PortsMap};
pub use kubelet_client::KubeletClient;

#[async_trait]
pub trait Kubelet: Send + Sync {
    /// Running containers of running pods in `namespaces`, or in every
    /// namespace when the slice is empty.
    async fn find_containers(&self, namespaces: &[String]) -> Result<Vec<ContainerInfo>, DiscoveryError>;
}
