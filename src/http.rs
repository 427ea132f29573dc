//! Request and response model for the cache worker.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

/// HTTP request method.
///
/// Only GET requests are ever intercepted or cached; the other variants
/// exist so pass-through requests can still be represented and forwarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
  Get,
  Head,
  Post,
  Put,
  Delete,
  Other(String),
}

impl Method {
  /// Parse a method name, case-insensitively. Unknown names are carried
  /// through as `Other` rather than rejected.
  pub fn parse(s: &str) -> Self {
    match s.to_ascii_uppercase().as_str() {
      "GET" => Method::Get,
      "HEAD" => Method::Head,
      "POST" => Method::Post,
      "PUT" => Method::Put,
      "DELETE" => Method::Delete,
      other => Method::Other(other.to_string()),
    }
  }

  pub fn is_get(&self) -> bool {
    matches!(self, Method::Get)
  }

  pub fn as_str(&self) -> &str {
    match self {
      Method::Get => "GET",
      Method::Head => "HEAD",
      Method::Post => "POST",
      Method::Put => "PUT",
      Method::Delete => "DELETE",
      Method::Other(s) => s,
    }
  }
}

/// What the request is loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Destination {
  /// A full navigable page
  Document,
  /// Anything else (script, style, image, data, ...)
  #[default]
  Subresource,
}

/// Response provenance classification.
///
/// Only `Basic` (same-origin, inspectable) responses may be cached.
/// `Opaque` responses come from cross-origin requests and are returned
/// unmodified without caching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
  Basic,
  Opaque,
}

/// An incoming HTTP request as seen by the interceptor.
#[derive(Debug, Clone)]
pub struct Request {
  pub method: Method,
  pub url: Url,
  pub destination: Destination,
}

impl Request {
  /// Create a GET request for a subresource.
  pub fn get(url: Url) -> Self {
    Self {
      method: Method::Get,
      url,
      destination: Destination::Subresource,
    }
  }

  /// Mark this request as a document navigation.
  pub fn document(mut self) -> Self {
    self.destination = Destination::Document;
    self
  }

  /// Whether the URL scheme is one the worker intercepts.
  pub fn is_http(&self) -> bool {
    matches!(self.url.scheme(), "http" | "https")
  }

  /// Stable cache key for this request.
  ///
  /// The URL is normalized (fragment dropped, query kept) and hashed so
  /// store keys have a fixed length regardless of URL size.
  pub fn cache_key(&self) -> String {
    let mut url = self.url.clone();
    url.set_fragment(None);

    let mut hasher = Sha256::new();
    hasher.update(url.as_str().as_bytes());
    hex::encode(hasher.finalize())
  }
}

/// A response snapshot: status, headers, and body as captured at fetch
/// time. This is what gets written into a cache generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
  pub status: u16,
  pub headers: Vec<(String, String)>,
  pub body: Vec<u8>,
  pub kind: ResponseKind,
}

impl Response {
  /// Whether this response may be written into the cache at all.
  ///
  /// Non-200 statuses and opaque (cross-origin) responses cannot be
  /// safely cached.
  pub fn is_cacheable(&self) -> bool {
    self.status == 200 && self.kind == ResponseKind::Basic
  }

  /// Look up a header value by case-insensitive name.
  pub fn header(&self, name: &str) -> Option<&str> {
    self
      .headers
      .iter()
      .find(|(n, _)| n.eq_ignore_ascii_case(name))
      .map(|(_, v)| v.as_str())
  }
}
