//! Service discovery through the Kubernetes API.

pub mod service_discoverer;
pub mod service_info;

use async_trait::async_trait;

use crate::errors::DiscoveryError;

pub use service_discoverer::KubeServiceDiscoverer;
pub use service_info::{ServiceInfo, ServicePortInfo};

#[async_trait]
pub trait ServiceDiscoverer: Send + Sync {
    /// Services in `namespaces`, or in every namespace when the slice is empty.
    async fn find_services(&self, namespaces: &[String]) -> Result<Vec<ServiceInfo>, DiscoveryError>;
}
