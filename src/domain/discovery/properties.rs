//! Names of the discovered variables and entity rewrite templates.

pub const LABEL_PREFIX: &str = "label.";
pub const ANNOTATION_PREFIX: &str = "annotation.";

pub const CLUSTER: &str = "clusterName";
pub const NAMESPACE: &str = "namespace";
pub const NODE_IP: &str = "nodeIP";
pub const NODE_NAME: &str = "nodeName";
pub const POD_NAME: &str = "podName";
pub const IMAGE: &str = "image";
pub const NAME: &str = "name";
pub const ID: &str = "id";
pub const IP: &str = "ip";
pub const PORTS: &str = "ports";

pub const SERVICE_NAME: &str = "serviceName";
pub const SERVICE_TYPE: &str = "serviceType";
pub const CLUSTER_IP: &str = "clusterIP";
pub const EXTERNAL_IPS: &str = "externalIPs";

pub const REWRITE_ACTION_REPLACE: &str = "replace";
pub const CONTAINER_REWRITE_MATCH: &str = "${ip}";
pub const CONTAINER_REWRITE_FIELD: &str = "k8s:${clusterName}:${namespace}:pod:${podName}:${name}";
pub const SERVICE_REWRITE_MATCH: &str = "${clusterIP}";
pub const SERVICE_REWRITE_FIELD: &str = "k8s:${clusterName}:${namespace}:service:${serviceName}";

/// Variables kept out of container metric annotations.
pub const CONTAINER_ANNOTATION_EXCLUSIONS: &[&str] = &[ID, IP, NODE_IP, PORTS];

/// Variables kept out of service metric annotations. Service ports stay.
pub const SERVICE_ANNOTATION_EXCLUSIONS: &[&str] = &[ID, IP, NODE_IP];
