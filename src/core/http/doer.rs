//! One-shot HTTP execution.
//!
//! A [`Doer`] performs exactly one request and hands back the status and the
//! full body. Retries live one level up, in [`super::client::HttpClient`].

use std::error::Error as StdError;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use http::header::{HeaderValue, AUTHORIZATION};
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use tracing::debug;

use crate::errors::{ConnectError, TransportError};

/// Default location of the service account token inside a pod.
pub const SERVICE_ACCOUNT_TOKEN_FILE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

#[async_trait]
pub trait Doer: Send + Sync {
    async fn execute(&self, request: Request<Vec<u8>>) -> Result<HttpResponse, TransportError>;
}

/// Plain client without credentials.
pub struct PlainDoer {
    client: reqwest::Client,
}

impl PlainDoer {
    pub fn new(timeout: Duration) -> Result<Self, ConnectError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConnectError::HttpClient(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Doer for PlainDoer {
    async fn execute(&self, request: Request<Vec<u8>>) -> Result<HttpResponse, TransportError> {
        send(&self.client, request).await
    }
}

/// Client for the kubelet's TLS endpoint.
///
/// The kubelet serves a certificate that cannot be verified the way the API
/// server's is, so verification is disabled. The token file is read again on
/// every request so a rotated token is picked up without reconnecting.
pub struct BearerTokenDoer {
    client: reqwest::Client,
    token_file: PathBuf,
}

impl BearerTokenDoer {
    pub fn new(token_file: impl Into<PathBuf>, timeout: Duration) -> Result<Self, ConnectError> {
        let token_file = token_file.into();

        std::fs::read_to_string(&token_file).map_err(|e| ConnectError::BearerToken {
            path: token_file.display().to_string(),
            reason: e.to_string(),
        })?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| ConnectError::HttpClient(e.to_string()))?;

        Ok(Self { client, token_file })
    }

    async fn bearer(&self, url: &str) -> Result<HeaderValue, TransportError> {
        let token = tokio::fs::read_to_string(&self.token_file)
            .await
            .map_err(|e| TransportError::Request {
                url: url.to_string(),
                reason: format!("reading token file {}: {}", self.token_file.display(), e),
            })?;

        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.trim())).map_err(|e| {
            TransportError::Request {
                url: url.to_string(),
                reason: format!("invalid bearer token: {}", e),
            }
        })?;
        value.set_sensitive(true);
        Ok(value)
    }
}

#[async_trait]
impl Doer for BearerTokenDoer {
    async fn execute(&self, mut request: Request<Vec<u8>>) -> Result<HttpResponse, TransportError> {
        let url = request.uri().to_string();
        let bearer = self.bearer(&url).await?;
        request.headers_mut().insert(AUTHORIZATION, bearer);

        send(&self.client, request).await
    }
}

/// Sends requests through the API server using the client's own credentials.
/// Request URIs are paths relative to the API server.
pub struct ApiServerDoer {
    client: kube::Client,
}

impl ApiServerDoer {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Doer for ApiServerDoer {
    async fn execute(&self, request: Request<Vec<u8>>) -> Result<HttpResponse, TransportError> {
        let url = request.uri().to_string();
        let request = request.map(kube::client::Body::from);

        let response = self
            .client
            .send(request)
            .await
            .map_err(|e| TransportError::Connect {
                url: url.clone(),
                reason: error_chain(&e),
            })?;

        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| TransportError::Connect {
                url: url.clone(),
                reason: format!("reading response body: {}", e),
            })?
            .to_bytes()
            .to_vec();

        debug!("{} answered {} through the API server", url, status);
        Ok(HttpResponse { status, body })
    }
}

async fn send(client: &reqwest::Client, request: Request<Vec<u8>>) -> Result<HttpResponse, TransportError> {
    let url = request.uri().to_string();
    let request = reqwest::Request::try_from(request).map_err(|e| TransportError::Request {
        url: url.clone(),
        reason: e.to_string(),
    })?;

    let response = client
        .execute(request)
        .await
        .map_err(|e| TransportError::Connect {
            url: url.clone(),
            reason: error_chain(&e),
        })?;

    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|e| TransportError::Connect {
            url: url.clone(),
            reason: format!("reading response body: {}", error_chain(&e)),
        })?
        .to_vec();

    debug!("{} answered {}", url, status);
    Ok(HttpResponse { status, body })
}

/// Flattens an error and its sources into one line; reqwest's top-level
/// message alone rarely names the actual cause.
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
