mod core;
mod domain;
mod errors;
#[cfg(test)]
mod test_support;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use tracing::{debug, error};

use crate::core::client::kube_client::{build_kube_client, build_kube_config};
use crate::core::config::Config;
use crate::core::http::client::HttpClient;
use crate::core::http::connector::DefaultConnector;
use crate::core::http::doer::SERVICE_ACCOUNT_TOKEN_FILE;
use crate::core::logging::init_logging;
use crate::domain::discovery::Discoverer;
use crate::domain::kubelet::KubeletClient;
use crate::domain::service::KubeServiceDiscoverer;

const EXIT_RUN: u8 = 2;
const EXIT_SERIALIZE: u8 = 3;
const EXIT_CONFIG: u8 = 4;
const EXIT_KUBE_CONFIG: u8 = 5;
const EXIT_KUBE_CLIENT: u8 = 6;
const EXIT_KUBELET: u8 = 7;

/// A fatal error and the exit code it maps to.
#[derive(Debug)]
struct Failure {
    code: u8,
    error: anyhow::Error,
}

trait OrExit<T> {
    fn or_exit(self, code: u8, context: &'static str) -> Result<T, Failure>;
}

impl<T, E> OrExit<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn or_exit(self, code: u8, context: &'static str) -> Result<T, Failure> {
        self.context(context).map_err(|error| Failure { code, error })
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let config = Config::load();
    let _guard = init_logging(config.as_ref().map(|c| c.verbose).unwrap_or(false));

    let result = match config.or_exit(EXIT_CONFIG, "reading config") {
        Ok(config) => {
            log_config(&config);
            run(&config).await
        }
        Err(failure) => Err(failure),
    };

    match result {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(Failure { code, error }) => {
            error!("{:#}", error);
            ExitCode::from(code)
        }
    }
}

// Config is parsed before the subscriber exists, so it is logged from here.
fn log_config(config: &Config) {
    debug!(
        cluster = %config.cluster_name,
        node = %config.node_name,
        namespaces = ?config.namespaces,
        discover_services = config.discover_services,
        "Configuration loaded"
    );
}

/// Discovers items and returns them as a single JSON array.
async fn run(config: &Config) -> Result<String, Failure> {
    let kube_config = build_kube_config(config)
        .await
        .or_exit(EXIT_KUBE_CONFIG, "loading kubernetes client config")?;

    let token_file = kube_config
        .auth_info
        .token_file
        .clone()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(SERVICE_ACCOUNT_TOKEN_FILE));

    let client = build_kube_client(kube_config)
        .or_exit(EXIT_KUBE_CLIENT, "creating kubernetes client")?;

    let mut discoverer = Discoverer::new(config.namespaces.clone(), config.discover_services);

    if config.discover_services {
        discoverer = discoverer
            .with_service_discoverer(Box::new(KubeServiceDiscoverer::new(client, config)));
    } else {
        let connector = DefaultConnector::new(client, config, token_file);
        let http_client = HttpClient::new(&connector, config.retries)
            .await
            .or_exit(EXIT_KUBELET, "creating kubelet client")?;
        debug!("Using kubelet endpoint {}", http_client.base_url());

        discoverer = discoverer.with_kubelet(Box::new(KubeletClient::new(http_client, config)));
    }

    let output = discoverer
        .run()
        .await
        .or_exit(EXIT_RUN, "running discovery")?;

    serde_json::to_string(&output).or_exit(EXIT_SERIALIZE, "serializing discovery output")
}
