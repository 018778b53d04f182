//! Reload client — tells the scraper to pick up the new target file.

use std::time::Duration;

use thiserror::Error;
use tracing::debug;

/// Errors from a reload attempt. All soft: the reconciler logs them and
/// moves on; the next cycle's publish gets another chance.
#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("invalid reload endpoint: {0}")]
    Endpoint(String),

    #[error("reload request failed: {0}")]
    Request(String),

    #[error("reload request timed out")]
    Timeout,

    #[error("reload endpoint returned status {0}")]
    Status(u16),
}

/// POSTs an empty body to the scraper's reload endpoint.
#[derive(Debug, Clone)]
pub struct ReloadClient {
    endpoint: String,
    timeout: Duration,
}

impl ReloadClient {
    /// Client for `endpoint` (e.g. `http://localhost:9090/-/reload`) with
    /// the given per-request timeout.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout,
        }
    }

    /// Issue the reload POST. Success is exactly HTTP 200.
    pub async fn signal(&self) -> Result<(), ReloadError> {
        let uri: http::Uri = self
            .endpoint
            .parse()
            .map_err(|e: http::uri::InvalidUri| ReloadError::Endpoint(e.to_string()))?;
        let authority = uri
            .authority()
            .ok_or_else(|| ReloadError::Endpoint("endpoint has no host".to_string()))?
            .clone();
        let address = format!("{}:{}", authority.host(), uri.port_u16().unwrap_or(80));
        let path = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());

        let result = tokio::time::timeout(self.timeout, async {
            let stream = tokio::net::TcpStream::connect(&address)
                .await
                .map_err(|e| ReloadError::Request(e.to_string()))?;

            let io = hyper_util::rt::TokioIo::new(stream);
            let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
                .await
                .map_err(|e| ReloadError::Request(e.to_string()))?;

            // Drive the connection in the background.
            tokio::spawn(async move {
                let _ = conn.await;
            });

            let req = http::Request::builder()
                .method("POST")
                .uri(&path)
                .header("host", authority.as_str())
                .header("user-agent", "scrapesync/0.1")
                .body(http_body_util::Empty::<bytes::Bytes>::new())
                .map_err(|e| ReloadError::Request(e.to_string()))?;

            let resp = sender
                .send_request(req)
                .await
                .map_err(|e| ReloadError::Request(e.to_string()))?;

            if resp.status() == http::StatusCode::OK {
                debug!(endpoint = %self.endpoint, "reload signal accepted");
                Ok(())
            } else {
                Err(ReloadError::Status(resp.status().as_u16()))
            }
        })
        .await;

        match result {
            Ok(inner) => inner,
            Err(_) => Err(ReloadError::Timeout),
        }
    }
}
