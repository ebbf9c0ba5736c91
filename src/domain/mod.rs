pub mod discovery;
pub mod kubelet;
pub mod service;
