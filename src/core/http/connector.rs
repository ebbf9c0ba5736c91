//! Picks the endpoint used to talk to the kubelet.
//!
//! Candidates are tried in order and each one is health-checked with
//! `GET /healthz`. The first candidate answering 200 wins. The local kubelet
//! endpoint always comes first, the API server proxy last.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::Request;
use tracing::{debug, info, warn};

use crate::core::client::nodes::{fetch_node_by_name, kubelet_port};
use crate::core::config::Config;
use crate::core::http::doer::{ApiServerDoer, BearerTokenDoer, Doer, PlainDoer};
use crate::errors::{ConnectError, TransportError};

pub const HEALTHZ_PATH: &str = "/healthz";
pub const KUBELET_READ_ONLY_PORT: u16 = 10255;
pub const KUBELET_SECURE_PORT: u16 = 10250;

/// Where to send kubelet requests and how.
#[derive(Clone)]
pub struct ConnectionParams {
    pub base_url: String,
    pub doer: Arc<dyn Doer>,
}

impl ConnectionParams {
    pub fn new(base_url: impl Into<String>, doer: Arc<dyn Doer>) -> Self {
        Self {
            base_url: base_url.into(),
            doer,
        }
    }

    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    LocalPlain,
    LocalTls,
    ApiProxy,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::LocalPlain => "local-plaintext",
            Strategy::LocalTls => "local-tls",
            Strategy::ApiProxy => "api-proxy",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub enum ProbeOutcome {
    Connected(ConnectionParams),
    Failed(TransportError),
}

#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<ConnectionParams, ConnectError>;
}

/// Orders the candidates for a resolved kubelet port.
pub fn strategies(tls: Option<bool>, port: u16, node_name: &str) -> Vec<Strategy> {
    let mut order = match (tls, port) {
        (Some(true), _) => {
            debug!("TLS explicitly requested, using https");
            vec![Strategy::LocalTls]
        }
        (Some(false), _) => vec![Strategy::LocalPlain],
        (None, KUBELET_READ_ONLY_PORT) => {
            debug!("Using http since port is {}", port);
            vec![Strategy::LocalPlain]
        }
        (None, KUBELET_SECURE_PORT) => {
            debug!("Using https since port is {}", port);
            vec![Strategy::LocalTls]
        }
        (None, _) => {
            warn!(
                "Cannot figure out the scheme from non-standard port {} and no TLS flag was given, \
                 trying http first then https",
                port
            );
            vec![Strategy::LocalPlain, Strategy::LocalTls]
        }
    };

    if !node_name.is_empty() {
        order.push(Strategy::ApiProxy);
    }
    order
}

/// Health-checks one candidate.
pub async fn probe(params: ConnectionParams) -> ProbeOutcome {
    let url = params.url_for(HEALTHZ_PATH);
    let request = match Request::get(url.as_str()).body(Vec::new()) {
        Ok(request) => request,
        Err(e) => {
            return ProbeOutcome::Failed(TransportError::Request {
                url,
                reason: e.to_string(),
            })
        }
    };

    match params.doer.execute(request).await {
        Ok(response) if response.status == http::StatusCode::OK => ProbeOutcome::Connected(params),
        Ok(response) => {
            ProbeOutcome::Failed(TransportError::status(url, response.status, &response.body))
        }
        Err(e) => ProbeOutcome::Failed(e),
    }
}

/// Probes the local kubelet, then the API server proxy.
pub struct DefaultConnector {
    kube: kube::Client,
    host: String,
    node_name: String,
    port: Option<u16>,
    tls: Option<bool>,
    timeout: Duration,
    token_file: PathBuf,
}

impl DefaultConnector {
    pub fn new(kube: kube::Client, config: &Config, token_file: impl Into<PathBuf>) -> Self {
        Self {
            kube,
            host: config.kubelet_host().to_string(),
            node_name: config.node_name.clone(),
            port: config.port,
            tls: config.tls,
            timeout: config.timeout(),
            token_file: token_file.into(),
        }
    }

    async fn resolve_port(&self) -> Result<u16, ConnectError> {
        if let Some(port) = self.port {
            debug!("Using port {} as configured", port);
            return Ok(port);
        }

        if self.node_name.is_empty() {
            return Err(ConnectError::Port(
                "no port configured and node name is not set".to_string(),
            ));
        }

        // One Node lookup saves asking the user for the kubelet port.
        let node = fetch_node_by_name(&self.kube, &self.node_name)
            .await
            .map_err(|e| ConnectError::Port(format!("getting node {:?}: {}", self.node_name, e)))?;

        let port = kubelet_port(&node).ok_or_else(|| {
            ConnectError::Port(format!(
                "node {:?} does not advertise a kubelet endpoint",
                self.node_name
            ))
        })?;

        debug!("Using port {} as found in the node status", port);
        u16::try_from(port).map_err(|_| ConnectError::Port(format!("invalid kubelet port {}", port)))
    }

    fn local_base(&self, scheme: &str, port: u16) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("{}://[{}]:{}", scheme, self.host, port)
        } else {
            format!("{}://{}:{}", scheme, self.host, port)
        }
    }

    /// Builds the parameters for one strategy. A doer that cannot be built
    /// fails only this candidate.
    fn candidate(&self, strategy: Strategy, port: u16) -> Result<ConnectionParams, TransportError> {
        let (base_url, doer): (String, Result<Arc<dyn Doer>, ConnectError>) = match strategy {
            Strategy::LocalPlain => (
                self.local_base("http", port),
                PlainDoer::new(self.timeout).map(|d| Arc::new(d) as Arc<dyn Doer>),
            ),
            Strategy::LocalTls => (
                self.local_base("https", port),
                BearerTokenDoer::new(&self.token_file, self.timeout)
                    .map(|d| Arc::new(d) as Arc<dyn Doer>),
            ),
            Strategy::ApiProxy => (
                format!(
                    "/api/v1/nodes/{}/proxy",
                    urlencoding::encode(&self.node_name)
                ),
                Ok(Arc::new(ApiServerDoer::new(self.kube.clone())) as Arc<dyn Doer>),
            ),
        };

        match doer {
            Ok(doer) => Ok(ConnectionParams::new(base_url, doer)),
            Err(e) => Err(TransportError::Request {
                url: base_url,
                reason: e.to_string(),
            }),
        }
    }
}

#[async_trait]
impl Connector for DefaultConnector {
    async fn connect(&self) -> Result<ConnectionParams, ConnectError> {
        let port = self.resolve_port().await?;
        let order = strategies(self.tls, port, &self.node_name);

        let mut tried = Vec::with_capacity(order.len());
        let mut last = None;

        for strategy in order {
            if strategy == Strategy::ApiProxy {
                warn!(
                    "Kubelet not reachable locally, trying the API server proxy to node {:?}. \
                     This may overload the API server, fix the kubelet host/port configuration",
                    self.node_name
                );
            }

            let outcome = match self.candidate(strategy, port) {
                Ok(params) => {
                    info!("Trying to connect to kubelet with {} at {}", strategy, params.base_url);
                    probe(params).await
                }
                Err(e) => ProbeOutcome::Failed(e),
            };

            match outcome {
                ProbeOutcome::Connected(params) => {
                    info!("Connected to kubelet with {} at {}", strategy, params.base_url);
                    return Ok(params);
                }
                ProbeOutcome::Failed(e) => {
                    warn!("Kubelet not reachable with {}: {}", strategy, e);
                    tried.push(strategy.to_string());
                    last = Some(e);
                }
            }
        }

        match last {
            Some(last) => Err(ConnectError::Exhausted {
                tried: tried.join(", "),
                last,
            }),
            None => Err(ConnectError::NoCandidates {
                node: self.node_name.clone(),
            }),
        }
    }
}

/// Hands out fixed parameters without probing.
#[cfg(test)]
pub struct StaticConnector {
    params: ConnectionParams,
}

#[cfg(test)]
impl StaticConnector {
    pub fn new(params: ConnectionParams) -> Self {
        Self { params }
    }
}

#[cfg(test)]
#[async_trait]
impl Connector for StaticConnector {
    async fn connect(&self) -> Result<ConnectionParams, ConnectError> {
        Ok(self.params.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeServer, Route};
    use http::StatusCode;

    fn config(host: &str, port: Option<u16>, node_name: &str) -> Config {
        Config {
            host: Some(host.to_string()),
            port,
            node_name: node_name.to_string(),
            cluster_name: "test-cluster".to_string(),
            timeout_ms: 1000,
            ..Default::default()
        }
    }

    fn token_file(token: &str) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), token).unwrap();
        file
    }

    /// A port nothing listens on.
    async fn closed_port() -> u16 {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    #[test]
    fn strategy_order_follows_tls_flag_and_port() {
        use Strategy::*;

        assert_eq!(strategies(Some(true), 10255, "n1"), vec![LocalTls, ApiProxy]);
        assert_eq!(strategies(Some(false), 10250, "n1"), vec![LocalPlain, ApiProxy]);
        assert_eq!(strategies(None, 10255, "n1"), vec![LocalPlain, ApiProxy]);
        assert_eq!(strategies(None, 10250, "n1"), vec![LocalTls, ApiProxy]);
        assert_eq!(strategies(None, 8080, "n1"), vec![LocalPlain, LocalTls, ApiProxy]);
        assert_eq!(strategies(None, 10255, ""), vec![LocalPlain]);
    }

    #[test]
    fn url_for_joins_base_and_path() {
        let doer: Arc<dyn Doer> = Arc::new(PlainDoer::new(Duration::from_secs(1)).unwrap());

        let local = ConnectionParams::new("http://localhost:10255", doer.clone());
        assert_eq!(local.url_for("/pods"), "http://localhost:10255/pods");

        let proxy = ConnectionParams::new("/api/v1/nodes/n1/proxy/", doer);
        assert_eq!(proxy.url_for("/healthz"), "/api/v1/nodes/n1/proxy/healthz");
    }

    #[tokio::test]
    async fn local_plaintext_kubelet_is_used_without_touching_the_proxy() {
        let kubelet = FakeServer::spawn(vec![Route::ok("/healthz", "ok")]).await;
        let api = FakeServer::spawn(vec![Route::ok("/api/v1/nodes/n1/proxy/healthz", "ok")]).await;
        let token = token_file("secret");

        let config = config(&kubelet.host(), Some(kubelet.port()), "n1");
        let connector = DefaultConnector::new(
            api.kube_client(Some(token.path())),
            &Config {
                tls: Some(false),
                ..config
            },
            token.path(),
        );

        let params = connector.connect().await.unwrap();

        assert_eq!(params.base_url, kubelet.base_url());
        assert_eq!(kubelet.authorization_for("/healthz"), Some(None));
        assert!(api.requests().is_empty());
    }

    #[tokio::test]
    async fn unreachable_kubelet_falls_back_to_the_api_proxy() {
        let kubelet = FakeServer::spawn(vec![Route::status(
            "/healthz",
            StatusCode::SERVICE_UNAVAILABLE,
            "down",
        )])
        .await;
        let api = FakeServer::spawn(vec![Route::ok("/api/v1/nodes/n1/proxy/healthz", "ok")]).await;
        let token = token_file("proxy-token");

        let config = Config {
            tls: Some(false),
            ..config(&kubelet.host(), Some(kubelet.port()), "n1")
        };
        let connector =
            DefaultConnector::new(api.kube_client(Some(token.path())), &config, token.path());

        let params = connector.connect().await.unwrap();

        assert_eq!(params.base_url, "/api/v1/nodes/n1/proxy");
        assert_eq!(kubelet.authorization_for("/healthz"), Some(None));
        assert_eq!(
            api.authorization_for("/api/v1/nodes/n1/proxy/healthz"),
            Some(Some("Bearer proxy-token".to_string()))
        );
    }

    #[tokio::test]
    async fn all_candidates_failing_reports_the_last_cause() {
        let port = closed_port().await;
        let api = FakeServer::spawn(vec![Route::status(
            "/api/v1/nodes/n1/proxy/healthz",
            StatusCode::FORBIDDEN,
            "forbidden",
        )])
        .await;
        let token = token_file("t");

        let config = Config {
            tls: Some(false),
            ..config("127.0.0.1", Some(port), "n1")
        };
        let connector =
            DefaultConnector::new(api.kube_client(Some(token.path())), &config, token.path());

        let err = connector.connect().await.unwrap_err();

        let ConnectError::Exhausted { tried, last } = err else {
            panic!("unexpected error variant");
        };
        assert_eq!(tried, "local-plaintext, api-proxy");
        assert!(matches!(
            last,
            TransportError::Status {
                status: StatusCode::FORBIDDEN,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn port_is_read_from_the_node_when_not_configured() {
        let kubelet = FakeServer::spawn(vec![Route::ok("/healthz", "ok")]).await;
        let node = format!(
            r#"{{"apiVersion":"v1","kind":"Node","metadata":{{"name":"n1"}},"status":{{"daemonEndpoints":{{"kubeletEndpoint":{{"Port":{}}}}}}}}}"#,
            kubelet.port()
        );
        let api = FakeServer::spawn(vec![Route::ok("/api/v1/nodes/n1", &node)]).await;
        let token = token_file("t");

        let config = Config {
            tls: Some(false),
            ..config(&kubelet.host(), None, "n1")
        };
        let connector =
            DefaultConnector::new(api.kube_client(Some(token.path())), &config, token.path());

        let params = connector.connect().await.unwrap();

        assert_eq!(params.base_url, kubelet.base_url());
        assert_eq!(api.paths(), vec!["/api/v1/nodes/n1".to_string()]);
    }

    #[tokio::test]
    async fn missing_port_and_node_name_is_a_port_error() {
        let api = FakeServer::spawn(vec![]).await;
        let connector = DefaultConnector::new(
            api.kube_client(None),
            &config("localhost", None, ""),
            "/nonexistent",
        );

        let err = connector.connect().await.unwrap_err();
        assert!(matches!(err, ConnectError::Port(_)));
    }

    #[tokio::test]
    async fn unreadable_token_file_falls_back_to_the_api_proxy() {
        let api = FakeServer::spawn(vec![Route::ok("/api/v1/nodes/n1/proxy/healthz", "ok")]).await;
        let config = config("127.0.0.1", Some(KUBELET_SECURE_PORT), "n1");
        let connector = DefaultConnector::new(
            api.kube_client(None),
            &config,
            "/nonexistent/serviceaccount/token",
        );

        let params = connector.connect().await.unwrap();

        assert_eq!(params.base_url, "/api/v1/nodes/n1/proxy");
        assert_eq!(
            api.paths(),
            vec!["/api/v1/nodes/n1/proxy/healthz".to_string()]
        );
    }

    #[tokio::test]
    async fn unreadable_token_file_without_proxy_is_reported() {
        let api = FakeServer::spawn(vec![]).await;
        let config = Config {
            tls: Some(true),
            ..config("127.0.0.1", Some(KUBELET_SECURE_PORT), "")
        };
        let connector = DefaultConnector::new(api.kube_client(None), &config, "/nonexistent/token");

        let err = connector.connect().await.unwrap_err();

        let ConnectError::Exhausted { tried, last } = err else {
            panic!("unexpected error variant");
        };
        assert_eq!(tried, "local-tls");
        let TransportError::Request { url, reason } = last else {
            panic!("unexpected transport error");
        };
        assert_eq!(url, "https://127.0.0.1:10250");
        assert!(reason.contains("/nonexistent/token"), "{reason}");
        assert!(api.requests().is_empty());
    }

    #[tokio::test]
    async fn static_connector_skips_probing() {
        let kubelet = FakeServer::spawn(vec![]).await;
        let doer: Arc<dyn Doer> = Arc::new(PlainDoer::new(Duration::from_secs(1)).unwrap());
        let connector = StaticConnector::new(ConnectionParams::new(kubelet.base_url(), doer));

        let params = connector.connect().await.unwrap();

        assert_eq!(params.base_url, kubelet.base_url());
        assert!(kubelet.requests().is_empty());
    }
}
