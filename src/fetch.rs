//! Network fetching seam.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use url::Url;

use crate::http::{Request, Response, ResponseKind};

/// Trait for issuing network requests.
///
/// The worker only depends on this seam, so tests can substitute canned
/// responses and count calls.
#[async_trait]
pub trait Fetcher: Send + Sync {
  async fn fetch(&self, request: &Request) -> Result<Response>;
}

/// Fetcher backed by a reqwest client.
///
/// Responses are classified relative to the worker's own origin: only a
/// response that lands there is `Basic`. A request to a third-party host
/// (or one redirected off-origin) yields an `Opaque` response, which the
/// worker returns unmodified and never caches.
#[derive(Clone)]
pub struct HttpFetcher {
  client: reqwest::Client,
  origin: Url,
}

impl HttpFetcher {
  pub fn new(origin: Url) -> Result<Self> {
    let client = reqwest::Client::builder()
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client, origin })
  }

  /// Classify a response by the URL it finally resolved to.
  fn classify(&self, final_url: &Url) -> ResponseKind {
    if same_origin(&self.origin, final_url) {
      ResponseKind::Basic
    } else {
      ResponseKind::Opaque
    }
  }
}

#[async_trait]
impl Fetcher for HttpFetcher {
  async fn fetch(&self, request: &Request) -> Result<Response> {
    let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
      .map_err(|e| eyre!("Invalid method {}: {}", request.method.as_str(), e))?;

    let response = self
      .client
      .request(method, request.url.clone())
      .send()
      .await
      .map_err(|e| eyre!("Fetch failed for {}: {}", request.url, e))?;

    let kind = self.classify(response.url());

    let status = response.status().as_u16();
    let headers = response
      .headers()
      .iter()
      .filter_map(|(name, value)| {
        value
          .to_str()
          .ok()
          .map(|v| (name.as_str().to_string(), v.to_string()))
      })
      .collect();

    let body = response
      .bytes()
      .await
      .map_err(|e| eyre!("Failed to read body for {}: {}", request.url, e))?
      .to_vec();

    Ok(Response {
      status,
      headers,
      body,
      kind,
    })
  }
}

fn same_origin(a: &Url, b: &Url) -> bool {
  a.scheme() == b.scheme()
    && a.host_str() == b.host_str()
    && a.port_or_known_default() == b.port_or_known_default()
}
