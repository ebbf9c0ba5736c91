use tracing::info;

use crate::domain::discovery::discovered_item::DiscoveredItem;
use crate::domain::discovery::property_mapper::{process_containers, process_services};
use crate::domain::kubelet::Kubelet;
use crate::domain::service::ServiceDiscoverer;
use crate::errors::DiscoveryError;

/// Runs one discovery pass, over containers or, when enabled, services.
pub struct Discoverer {
    namespaces: Vec<String>,
    kubelet: Option<Box<dyn Kubelet>>,
    service_discoverer: Option<Box<dyn ServiceDiscoverer>>,
    discover_services: bool,
}

impl Discoverer {
    pub fn new(namespaces: Vec<String>, discover_services: bool) -> Self {
        Self {
            namespaces,
            kubelet: None,
            service_discoverer: None,
            discover_services,
        }
    }

    pub fn with_kubelet(mut self, kubelet: Box<dyn Kubelet>) -> Self {
        self.kubelet = Some(kubelet);
        self
    }

    pub fn with_service_discoverer(mut self, discoverer: Box<dyn ServiceDiscoverer>) -> Self {
        self.service_discoverer = Some(discoverer);
        self
    }

    pub async fn run(&self) -> Result<Vec<DiscoveredItem>, DiscoveryError> {
        if self.discover_services {
            let discoverer = self
                .service_discoverer
                .as_ref()
                .ok_or(DiscoveryError::ServiceDiscovererMissing)?;
            let services = discoverer.find_services(&self.namespaces).await?;
            info!("Discovered {} service(s)", services.len());
            return Ok(process_services(&services));
        }

        let kubelet = self.kubelet.as_ref().ok_or(DiscoveryError::KubeletMissing)?;
        let containers = kubelet.find_containers(&self.namespaces).await?;
        info!("Discovered {} container(s)", containers.len());
        Ok(process_containers(&containers))
    }
}
