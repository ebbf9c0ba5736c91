//! Maps k8s-openapi types → discovery records
use crate::core::client::kube_resources::{IntOrString, Pod, Service, ServicePort};
use crate::domain::kubelet::container_info::{ContainerInfo, PortsMap};
use crate::domain::service::service_info::{ServiceInfo, ServicePortInfo};

pub const POD_PHASE_RUNNING: &str = "Running";

/// One record per running container of `pod`. Pods outside the Running phase
/// yield nothing, and so do waiting or terminated containers.
pub fn map_pod_to_containers(pod: &Pod, cluster_name: &str, node_name: &str) -> Vec<ContainerInfo> {
    let Some(status) = pod.status.as_ref() else {
        return Vec::new();
    };
    if status.phase.as_deref() != Some(POD_PHASE_RUNNING) {
        return Vec::new();
    }

    let metadata = &pod.metadata;
    let statuses = status.container_statuses.as_deref().unwrap_or_default();

    statuses
        .iter()
        .enumerate()
        .filter(|(_, cs)| cs.state.as_ref().and_then(|s| s.running.as_ref()).is_some())
        .map(|(idx, cs)| ContainerInfo {
            name: cs.name.clone(),
            id: cs.container_id.clone().unwrap_or_default(),
            image: cs.image.clone(),
            image_id: cs.image_id.clone(),
            ports: container_ports(pod, &cs.name, idx),
            pod_labels: metadata.labels.clone().unwrap_or_default(),
            pod_annotations: metadata.annotations.clone().unwrap_or_default(),
            pod_ip: status.pod_ip.clone().unwrap_or_default(),
            pod_name: metadata.name.clone().unwrap_or_default(),
            node_name: node_name.to_string(),
            node_ip: status.host_ip.clone().unwrap_or_default(),
            namespace: metadata.namespace.clone().unwrap_or_default(),
            cluster: cluster_name.to_string(),
        })
        .collect()
}

/// Ports declared by the spec container backing a status.
///
/// Statuses are not guaranteed to follow the spec order, so the container is
/// looked up by name first and by position only when no name matches.
pub fn container_ports(pod: &Pod, container_name: &str, index: usize) -> PortsMap {
    let containers = pod
        .spec
        .as_ref()
        .map(|spec| spec.containers.as_slice())
        .unwrap_or_default();

    let container = containers
        .iter()
        .find(|c| c.name == container_name)
        .or_else(|| containers.get(index));

    let mut ports = PortsMap::new();
    let declared = container.and_then(|c| c.ports.as_deref()).unwrap_or_default();
    for (port_index, port) in declared.iter().enumerate() {
        ports.insert(port_index.to_string(), port.container_port);
        if let Some(name) = port.name.as_deref().filter(|n| !n.is_empty()) {
            ports.insert(name.to_string(), port.container_port);
        }
    }
    ports
}

pub fn map_service_to_info(svc: &Service, cluster_name: &str) -> ServiceInfo {
    let metadata = &svc.metadata;
    let spec = svc.spec.as_ref();

    let ports = spec
        .and_then(|s| s.ports.as_deref())
        .unwrap_or_default()
        .iter()
        .map(map_service_port)
        .collect();

    ServiceInfo {
        name: metadata.name.clone().unwrap_or_default(),
        namespace: metadata.namespace.clone().unwrap_or_default(),
        type_: spec.and_then(|s| s.type_.clone()).unwrap_or_default(),
        cluster_ip: spec.and_then(|s| s.cluster_ip.clone()).unwrap_or_default(),
        external_ips: spec.and_then(|s| s.external_ips.clone()).unwrap_or_default(),
        ports,
        selector: spec.and_then(|s| s.selector.clone()).unwrap_or_default(),
        labels: metadata.labels.clone().unwrap_or_default(),
        annotations: metadata.annotations.clone().unwrap_or_default(),
        cluster: cluster_name.to_string(),
    }
}

fn map_service_port(port: &ServicePort) -> ServicePortInfo {
    ServicePortInfo {
        name: port.name.clone().unwrap_or_default(),
        port: port.port,
        target_port: target_port_string(port.target_port.as_ref()),
        protocol: port.protocol.clone().unwrap_or_default(),
        node_port: port.node_port.filter(|p| *p != 0),
    }
}

/// Numeric target ports render as decimal strings, named ones verbatim.
pub fn target_port_string(target: Option<&IntOrString>) -> String {
    match target {
        Some(IntOrString::Int(port)) => port.to_string(),
        Some(IntOrString::String(name)) => name.clone(),
        None => String::new(),
    }
}
