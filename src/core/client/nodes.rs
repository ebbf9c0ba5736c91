use kube::{Api, Client};
use tracing::debug;

use crate::core::client::kube_resources::Node;

/// Fetch a single node by name
pub async fn fetch_node_by_name(client: &Client, name: &str) -> kube::Result<Node> {
    let nodes: Api<Node> = Api::all(client.clone());
    let node = nodes.get(name).await?;

    debug!("Fetched node: {}", name);
    Ok(node)
}

/// Kubelet port advertised in `status.daemonEndpoints.kubeletEndpoint`
pub fn kubelet_port(node: &Node) -> Option<i32> {
    node.status
        .as_ref()
        .and_then(|s| s.daemon_endpoints.as_ref())
        .and_then(|d| d.kubelet_endpoint.as_ref())
        .map(|e| e.port)
        .filter(|port| *port > 0)
}
