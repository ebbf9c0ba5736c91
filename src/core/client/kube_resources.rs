//! Re-export the Kubernetes resource types used across the crate from k8s-openapi

pub use k8s_openapi::api::core::v1::{
    Container as K8sContainer,
    ContainerPort,
    ContainerStatus,
    Node,
    Pod,
    Service,
    ServicePort,
};

pub use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
