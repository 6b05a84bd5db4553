//! Network transport for link probes.

use super::classify::needs_content;
use super::RawLink;
use crate::error::{CoreError, ProbeError};
use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use reqwest::{redirect, Client, Method, Response, StatusCode};
use std::time::{Duration, Instant};
use tracing::debug;

/// Upper bound on body bytes read from content-inspected hosts
pub const MAX_BODY_BYTES: usize = 64 * 1024;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// What a probe observed. The connection is already released.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeResponse {
    pub status: u16,
    pub final_url: Option<String>,
    pub location: Option<String>,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    /// Lossy UTF-8 prefix of the body, only for content-inspected hosts
    pub body: Option<String>,
    pub elapsed: Duration,
}

/// Transport used by the health engine. Mocked in tests.
#[async_trait]
pub trait LinkProber: Send + Sync {
    async fn probe(&self, link: &RawLink) -> Result<ProbeResponse, ProbeError>;
}

/// reqwest-backed prober.
pub struct HttpProber {
    /// Never follows redirects; 3xx are classified as locked
    head_client: Client,
    /// Follows redirects for shortlink and streaming pages
    page_client: Client,
    max_body_bytes: usize,
}

impl HttpProber {
    pub fn new() -> Result<Self, CoreError> {
        let head_client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(redirect::Policy::none())
            .build()?;
        let page_client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(redirect::Policy::limited(10))
            .cookie_store(true)
            .build()?;
        Ok(Self {
            head_client,
            page_client,
            max_body_bytes: MAX_BODY_BYTES,
        })
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    async fn head_or_get(&self, url: &str) -> Result<Response, ProbeError> {
        match self.head_client.request(Method::HEAD, url).send().await {
            Ok(resp)
                if resp.status() != StatusCode::METHOD_NOT_ALLOWED
                    && resp.status() != StatusCode::NOT_IMPLEMENTED =>
            {
                Ok(resp)
            }
            Ok(resp) => {
                debug!(
                    target: "marquee.health",
                    url,
                    status = resp.status().as_u16(),
                    "HEAD rejected, retrying with GET"
                );
                Ok(self.head_client.get(url).send().await?)
            }
            Err(err) => {
                debug!(
                    target: "marquee.health",
                    url,
                    error = %err,
                    "HEAD failed, retrying with GET"
                );
                Ok(self.head_client.get(url).send().await?)
            }
        }
    }

    async fn read_prefix(&self, mut response: Response) -> Result<String, ProbeError> {
        let mut buf: Vec<u8> = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            let room = self.max_body_bytes.saturating_sub(buf.len());
            buf.extend_from_slice(&chunk[..chunk.len().min(room)]);
            if buf.len() >= self.max_body_bytes {
                break;
            }
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

fn header_str(response: &Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

#[async_trait]
impl LinkProber for HttpProber {
    async fn probe(&self, link: &RawLink) -> Result<ProbeResponse, ProbeError> {
        let parsed =
            url::Url::parse(&link.url).map_err(|e| ProbeError::InvalidUrl(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ProbeError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                parsed.scheme()
            )));
        }

        let start = Instant::now();
        let inspect = needs_content(&link.url);
        let response = if inspect {
            self.page_client.get(parsed.as_str()).send().await?
        } else {
            self.head_or_get(parsed.as_str()).await?
        };

        let status = response.status().as_u16();
        let final_url = Some(response.url().to_string());
        let location = header_str(&response, LOCATION);
        let content_type = header_str(&response, CONTENT_TYPE);
        let content_length = header_str(&response, CONTENT_LENGTH).and_then(|v| v.parse().ok());

        // Dropping the response releases the connection without reading the body.
        let body = if inspect {
            Some(self.read_prefix(response).await?)
        } else {
            drop(response);
            None
        };

        Ok(ProbeResponse {
            status,
            final_url,
            location,
            content_type,
            content_length,
            body,
            elapsed: start.elapsed(),
        })
    }
}
