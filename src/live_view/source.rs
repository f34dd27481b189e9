//! Live-view byte stream sources
//!
//! The client never builds HTTP requests itself; it asks a [`StreamSource`]
//! for a fresh stream every time a session starts.

use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use std::time::Duration;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;

/// Byte stream carrying live-view packets
pub type LiveStream = Box<dyn AsyncRead + Send + Unpin>;

/// Opens a new live-view stream for a URL
#[async_trait]
pub trait StreamSource: Send + Sync {
    async fn open(&self, url: &str) -> Result<LiveStream>;
}

/// HTTP GET streaming source
pub struct HttpStreamSource {
    client: reqwest::Client,
}

impl HttpStreamSource {
    /// Only the connect phase is bounded; the body streams indefinitely
    pub fn new(connect_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl StreamSource for HttpStreamSource {
    async fn open(&self, url: &str) -> Result<LiveStream> {
        tracing::debug!(url = %url, "Opening live-view stream");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Network(format!("live-view connect failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Network(format!(
                "live-view stream returned status {}",
                status
            )));
        }

        let body = response.bytes_stream().map_err(std::io::Error::other);
        Ok(Box::new(StreamReader::new(Box::pin(body))))
    }
}
