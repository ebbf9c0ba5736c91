use std::collections::BTreeMap;

/// Container ports keyed by positional index and, when declared, by name.
pub type PortsMap = BTreeMap<String, i32>;
pub type LabelsMap = BTreeMap<String, String>;
pub type AnnotationsMap = BTreeMap<String, String>;

/// A running container of a running pod, as seen by the kubelet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerInfo {
    pub name: String,
    pub id: String,
    pub image: String,
    pub image_id: String,
    pub ports: PortsMap,
    pub pod_labels: LabelsMap,
    pub pod_annotations: AnnotationsMap,
    pub pod_ip: String,
    pub pod_name: String,
    pub node_name: String,
    pub node_ip: String,
    pub namespace: String,
    pub cluster: String,
}
