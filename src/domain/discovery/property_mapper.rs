//! Turns container and service records into discovered items.

use serde_json::Value;

use crate::domain::discovery::discovered_item::{
    DiscoveredItem, MetricAnnotationsMap, Replacement, VariablesMap,
};
use crate::domain::discovery::properties::*;
use crate::domain::kubelet::ContainerInfo;
use crate::domain::service::ServiceInfo;

pub fn process_containers(containers: &[ContainerInfo]) -> Vec<DiscoveredItem> {
    containers.iter().map(container_item).collect()
}

pub fn process_services(services: &[ServiceInfo]) -> Vec<DiscoveredItem> {
    services.iter().map(service_item).collect()
}

fn container_item(c: &ContainerInfo) -> DiscoveredItem {
    let mut variables = VariablesMap::new();

    set(&mut variables, NAMESPACE, &c.namespace);
    set(&mut variables, POD_NAME, &c.pod_name);
    set(&mut variables, IP, &c.pod_ip);
    set(&mut variables, CLUSTER, &c.cluster);
    set(&mut variables, NODE_NAME, &c.node_name);
    set(&mut variables, NODE_IP, &c.node_ip);
    // Pod labels apply to each of its containers.
    for (key, value) in &c.pod_labels {
        set(&mut variables, &format!("{LABEL_PREFIX}{key}"), value);
    }
    set(&mut variables, ID, &c.id);
    set(&mut variables, NAME, &c.name);
    set(&mut variables, IMAGE, &c.image);
    let ports = c
        .ports
        .iter()
        .map(|(key, port)| (key.clone(), Value::from(*port)))
        .collect();
    variables.insert(PORTS.to_string(), Value::Object(ports));
    for (key, value) in &c.pod_annotations {
        set(&mut variables, &format!("{ANNOTATION_PREFIX}{key}"), value);
    }

    let metric_annotations = metric_annotations(&variables, CONTAINER_ANNOTATION_EXCLUSIONS);
    DiscoveredItem {
        variables,
        metric_annotations,
        entity_rewrites: vec![Replacement::new(
            REWRITE_ACTION_REPLACE,
            CONTAINER_REWRITE_MATCH,
            CONTAINER_REWRITE_FIELD,
        )],
    }
}

fn service_item(svc: &ServiceInfo) -> DiscoveredItem {
    let mut variables = VariablesMap::new();

    set(&mut variables, CLUSTER, &svc.cluster);
    set(&mut variables, NAMESPACE, &svc.namespace);
    set(&mut variables, SERVICE_NAME, &svc.name);
    set(&mut variables, SERVICE_TYPE, &svc.type_);
    set(&mut variables, CLUSTER_IP, &svc.cluster_ip);
    if !svc.external_ips.is_empty() {
        variables.insert(EXTERNAL_IPS.to_string(), Value::from(svc.external_ips.clone()));
    }
    // Plain structs always serialize.
    let ports = serde_json::to_value(&svc.ports).unwrap_or_default();
    variables.insert(PORTS.to_string(), ports);

    // Selector and labels share the label. prefix; labels win on collision.
    for (key, value) in svc.selector.iter().chain(&svc.labels) {
        set(&mut variables, &format!("{LABEL_PREFIX}{key}"), value);
    }
    for (key, value) in &svc.annotations {
        set(&mut variables, &format!("{ANNOTATION_PREFIX}{key}"), value);
    }

    let metric_annotations = metric_annotations(&variables, SERVICE_ANNOTATION_EXCLUSIONS);
    DiscoveredItem {
        variables,
        metric_annotations,
        entity_rewrites: vec![Replacement::new(
            REWRITE_ACTION_REPLACE,
            SERVICE_REWRITE_MATCH,
            SERVICE_REWRITE_FIELD,
        )],
    }
}

fn set(variables: &mut VariablesMap, key: &str, value: &str) {
    variables.insert(key.to_string(), Value::String(value.to_string()));
}

/// Variables minus pod/service annotations and the `excluded` keys.
pub fn metric_annotations(variables: &VariablesMap, excluded: &[&str]) -> MetricAnnotationsMap {
    variables
        .iter()
        .filter(|(key, _)| !key.starts_with(ANNOTATION_PREFIX))
        .filter(|(key, _)| !excluded.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
