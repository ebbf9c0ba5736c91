//! Runtime configuration.
//!
//! Built once at startup from flags, `NRIA_*` environment variables and an
//! optional `.env` file, then handed by reference to every component.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use validator::Validate;

use crate::errors::ConfigError;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_RETRIES: u32 = 5;

const CLUSTER_NAME_ENV: &str = "CLUSTER_NAME";
const NODE_NAME_ENV: &str = "NRI_KUBERNETES_NODE_NAME";
const NODE_NAME_LEGACY_ENV: &str = "NRK8S_NODE_NAME";

/// Command line surface. Every flag can also be given as `NRIA_<FLAG>`.
#[derive(Debug, Clone, Default, Parser)]
#[command(version, about = "Discovers running containers or services on a Kubernetes node")]
pub struct Args {
    /// Comma separated list of namespaces to discover pods on (empty means all)
    #[arg(long, env = "NRIA_NAMESPACES", default_value = "")]
    pub namespaces: String,

    /// Port used to connect to the kubelet (looked up on the Node object when unset)
    #[arg(long, env = "NRIA_PORT")]
    pub port: Option<u16>,

    /// Host used to connect to the kubelet (defaults to the node name)
    #[arg(long, env = "NRIA_HOST")]
    pub host: Option<String>,

    /// Use a secure (tls) connection to the kubelet
    #[arg(long, env = "NRIA_TLS", num_args = 0..=1, default_missing_value = "true")]
    pub tls: Option<bool>,

    /// Deprecated: use a non-tls connection. Takes precedence over `--tls`
    #[arg(long, env = "NRIA_INSECURE", num_args = 0..=1, default_missing_value = "true")]
    pub insecure: Option<bool>,

    /// Timeout of a single HTTP attempt, in milliseconds
    #[arg(long, env = "NRIA_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_MS)]
    pub timeout: u64,

    /// Number of attempts before giving up a request to the kubelet
    #[arg(long, env = "NRIA_RETRIES", default_value_t = DEFAULT_RETRIES)]
    pub retries: u32,

    /// Kubeconfig used when not running inside the cluster
    #[arg(long, env = "NRIA_KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Name of the cluster, used to build entity names
    #[arg(long = "cluster_name", env = "NRIA_CLUSTER_NAME", default_value = "")]
    pub cluster_name: String,

    /// Name of the node this process runs on
    #[arg(long = "node_name", env = "NRIA_NODE_NAME", default_value = "")]
    pub node_name: String,

    /// Discover Kubernetes services instead of containers
    #[arg(long = "discover-services", env = "NRIA_DISCOVER_SERVICES")]
    pub discover_services: bool,

    /// Enable debug logging
    #[arg(long, env = "NRIA_VERBOSE")]
    pub verbose: bool,
}

#[derive(Debug, Clone, Validate)]
pub struct Config {
    pub namespaces: Vec<String>,
    pub port: Option<u16>,
    pub host: Option<String>,
    pub tls: Option<bool>,
    #[validate(range(min = 1, message = "timeout must be at least 1ms"))]
    pub timeout_ms: u64,
    #[validate(range(min = 1, message = "retries must be at least 1"))]
    pub retries: u32,
    pub kubeconfig: Option<PathBuf>,
    pub cluster_name: String,
    pub node_name: String,
    pub discover_services: bool,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespaces: Vec::new(),
            port: None,
            host: None,
            tls: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            retries: DEFAULT_RETRIES,
            kubeconfig: None,
            cluster_name: String::new(),
            node_name: String::new(),
            discover_services: false,
            verbose: false,
        }
    }
}

impl Config {
    /// Reads `.env`, the process arguments and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        // A missing .env file is the normal case.
        let _ = dotenvy::dotenv();
        Self::from_args(Args::parse(), |key| std::env::var(key).ok())
    }

    /// Applies the legacy precedence rules on top of the parsed arguments.
    pub fn from_args<F>(args: Args, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let cluster_name = env(CLUSTER_NAME_ENV).unwrap_or(args.cluster_name);
        if cluster_name.is_empty() {
            return Err(ConfigError::ClusterNameNotSet);
        }

        // The legacy variable wins over the newer one, both win over the flag.
        let node_name = env(NODE_NAME_LEGACY_ENV)
            .or_else(|| env(NODE_NAME_ENV))
            .unwrap_or(args.node_name);

        let tls = match args.insecure {
            Some(insecure) => Some(!insecure),
            None => args.tls,
        };

        let config = Config {
            namespaces: split_namespaces(&args.namespaces),
            port: args.port,
            host: args.host.filter(|h| !h.is_empty()),
            tls,
            timeout_ms: args.timeout,
            retries: args.retries,
            kubeconfig: args.kubeconfig,
            cluster_name,
            node_name,
            discover_services: args.discover_services,
            verbose: args.verbose,
        };

        config
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Host of the local kubelet endpoint.
    pub fn kubelet_host(&self) -> &str {
        match &self.host {
            Some(host) => host,
            None if !self.node_name.is_empty() => &self.node_name,
            None => DEFAULT_HOST,
        }
    }
}

fn split_namespaces(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|ns| !ns.is_empty())
        .map(String::from)
        .collect()
}
