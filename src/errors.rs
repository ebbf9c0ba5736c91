use http::StatusCode;
use thiserror::Error;

/// Longest slice of a response body kept in an error message.
const BODY_SNIPPET_LIMIT: usize = 512;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cluster name is not set")]
    ClusterNameNotSet,

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("loading kubernetes configuration: {0}")]
    KubeConfig(String),
}

/// Failure of a single HTTP exchange, or of a whole retried call.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("building request to {url}: {reason}")]
    Request { url: String, reason: String },

    #[error("connecting to {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("calling {url} got non-2xx status code {status}: {body}")]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },

    #[error("giving up on {url} after {attempts} attempt(s): {last}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        #[source]
        last: Box<TransportError>,
    },
}

impl TransportError {
    pub fn status(url: impl Into<String>, status: StatusCode, body: &[u8]) -> Self {
        TransportError::Status {
            url: url.into(),
            status,
            body: body_snippet(body),
        }
    }

    /// Whether another attempt of the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Request { .. } => false,
            TransportError::Connect { .. } => true,
            TransportError::Status { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            TransportError::RetriesExhausted { .. } => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("getting kubelet port: {0}")]
    Port(String),

    #[error("building http client: {0}")]
    HttpClient(String),

    #[error("creating bearer token transport from {path}: {reason}")]
    BearerToken { path: String, reason: String },

    #[error("no connection candidate available for node {node:?}")]
    NoCandidates { node: String },

    #[error("kubelet not reachable (tried {tried}): {last}")]
    Exhausted {
        tried: String,
        #[source]
        last: TransportError,
    },
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("failed to execute request against kubelet: {0}")]
    Kubelet(#[from] TransportError),

    #[error("failed to unmarshal kubelet response into a list of pods: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to list services: {0}")]
    ListServices(#[source] kube::Error),

    #[error("failed to list services in namespace {namespace}: {source}")]
    ListNamespacedServices {
        namespace: String,
        #[source]
        source: kube::Error,
    },

    #[error("kubelet client not configured")]
    KubeletMissing,

    #[error("service discoverer not configured but discover-services flag is set")]
    ServiceDiscovererMissing,
}

fn body_snippet(body: &[u8]) -> String {
    let end = body.len().min(BODY_SNIPPET_LIMIT);
    let text = String::from_utf8_lossy(&body[..end]);
    let text = text.trim();
    if body.len() > BODY_SNIPPET_LIMIT {
        format!("{text}...")
    } else {
        text.to_string()
    }
}
