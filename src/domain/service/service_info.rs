use serde::Serialize;
use serde_with::skip_serializing_none;

use crate::domain::kubelet::container_info::{AnnotationsMap, LabelsMap};

/// A service port as emitted in the `ports` variable.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePortInfo {
    pub name: String,
    pub port: i32,
    pub target_port: String,
    pub protocol: String,
    pub node_port: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceInfo {
    pub name: String,
    pub namespace: String,
    pub type_: String,
    pub cluster_ip: String,
    pub external_ips: Vec<String>,
    pub ports: Vec<ServicePortInfo>,
    pub selector: LabelsMap,
    pub labels: LabelsMap,
    pub annotations: AnnotationsMap,
    pub cluster: String,
}
