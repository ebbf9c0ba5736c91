use kube::api::ListParams;
use kube::{Api, Client};
use tracing::debug;

use crate::core::client::kube_resources::Service;

/// Lists services in `namespace`, or across the whole cluster when `None`.
pub async fn list_services(client: &Client, namespace: Option<&str>) -> kube::Result<Vec<Service>> {
    let services: Api<Service> = match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    };
    let svc_list = services.list(&ListParams::default()).await?;

    debug!(
        "Listed {} service(s) in {}",
        svc_list.items.len(),
        namespace.unwrap_or("all namespaces")
    );
    Ok(svc_list.items)
}
