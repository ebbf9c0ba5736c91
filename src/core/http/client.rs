use std::time::Duration;

use backon::{BackoffBuilder, Retryable};
use http::Request;
use tracing::{debug, warn};

use crate::core::http::connector::{ConnectionParams, Connector};
use crate::errors::{ConnectError, TransportError};

/// Pause after the first failed attempt; the n-th failure waits n times this.
pub const DEFAULT_BACKOFF_STEP: Duration = Duration::from_millis(100);

/// Linear backoff: `step`, `2 * step`, ... for `max_attempts - 1` retries.
#[derive(Debug, Clone, Copy)]
pub struct LinearBuilder {
    step: Duration,
    max_attempts: u32,
}

impl LinearBuilder {
    pub fn new(step: Duration, max_attempts: u32) -> Self {
        Self { step, max_attempts }
    }
}

impl BackoffBuilder for LinearBuilder {
    type Backoff = LinearBackoff;

    fn build(self) -> Self::Backoff {
        LinearBackoff {
            step: self.step,
            retry: 0,
            max_retries: self.max_attempts.saturating_sub(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LinearBackoff {
    step: Duration,
    retry: u32,
    max_retries: u32,
}

impl Iterator for LinearBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.retry >= self.max_retries {
            return None;
        }
        self.retry += 1;
        Some(self.step * self.retry)
    }
}

/// GET client bound to the endpoint chosen by a [`Connector`].
///
/// Each call is retried with a linear backoff. The per-attempt timeout is the
/// one configured on the underlying doer.
#[derive(Debug, Clone)]
pub struct HttpClient {
    params: ConnectionParams,
    max_attempts: u32,
    backoff_step: Duration,
}

impl HttpClient {
    pub async fn new(connector: &dyn Connector, max_attempts: u32) -> Result<Self, ConnectError> {
        let params = connector.connect().await?;
        Ok(Self::from_params(params, max_attempts))
    }

    pub fn from_params(params: ConnectionParams, max_attempts: u32) -> Self {
        Self {
            params,
            max_attempts: max_attempts.max(1),
            backoff_step: DEFAULT_BACKOFF_STEP,
        }
    }

    #[cfg(test)]
    pub fn with_backoff(mut self, step: Duration) -> Self {
        self.backoff_step = step;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.params.base_url
    }

    /// Returns the body of a 2xx answer to `GET {base}{path}`.
    pub async fn get(&self, path: &str) -> Result<Vec<u8>, TransportError> {
        let url = self.params.url_for(path);

        let result = (|| self.attempt(&url))
            .retry(LinearBuilder::new(self.backoff_step, self.max_attempts))
            .sleep(tokio::time::sleep)
            .when(TransportError::is_retryable)
            .notify(|err: &TransportError, pause: Duration| {
                warn!("GET {} failed, retrying in {:?}: {}", url, pause, err);
            })
            .await;

        // A retryable error only surfaces once the backoff has run out.
        result.map_err(|err| {
            if err.is_retryable() {
                TransportError::RetriesExhausted {
                    url: url.clone(),
                    attempts: self.max_attempts,
                    last: Box::new(err),
                }
            } else {
                err
            }
        })
    }

    async fn attempt(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        let request = Request::get(url)
            .body(Vec::new())
            .map_err(|e| TransportError::Request {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let response = self.params.doer.execute(request).await?;
        if !response.status.is_success() {
            return Err(TransportError::status(url, response.status, &response.body));
        }

        debug!("GET {} returned {} bytes", url, response.body.len());
        Ok(response.body)
    }
}
