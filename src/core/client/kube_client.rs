use std::path::Path;

use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::{debug, warn};

use crate::core::config::Config as AppConfig;
use crate::errors::ConfigError;

/// Resolves the API server configuration: in-cluster first, then the
/// kubeconfig given in the app config, then kube's default kubeconfig lookup.
///
/// Connect and read timeouts are taken from the app config so that calls
/// proxied through the API server honour the same per-attempt deadline as
/// direct kubelet calls.
pub async fn build_kube_config(config: &AppConfig) -> Result<Config, ConfigError> {
    let mut kube_config = match Config::incluster() {
        Ok(kube_config) => {
            debug!("Using in-cluster configuration");
            kube_config
        }
        Err(e) => {
            warn!("Collecting in cluster config: {}", e);
            load_kubeconfig(config.kubeconfig.as_deref()).await?
        }
    };

    kube_config.connect_timeout = Some(config.timeout());
    kube_config.read_timeout = Some(config.timeout());
    Ok(kube_config)
}

async fn load_kubeconfig(path: Option<&Path>) -> Result<Config, ConfigError> {
    let options = KubeConfigOptions::default();

    let kube_config = match path {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                ConfigError::KubeConfig(format!("reading {}: {}", path.display(), e))
            })?;
            Config::from_custom_kubeconfig(kubeconfig, &options).await
        }
        None => Config::from_kubeconfig(&options).await,
    }
    .map_err(|e| ConfigError::KubeConfig(format!("could not load local kube config: {}", e)))?;

    warn!(
        "Using local kube config {}",
        path.map(|p| p.display().to_string())
            .unwrap_or_else(|| "from the default location".to_string())
    );
    Ok(kube_config)
}

/// Creates a Kubernetes client from an already resolved configuration
pub fn build_kube_client(kube_config: Config) -> Result<Client, kube::Error> {
    let client = Client::try_from(kube_config)?;

    debug!("Kubernetes client initialized successfully");
    Ok(client)
}
