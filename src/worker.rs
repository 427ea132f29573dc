//! The offline cache worker: install, fetch interception, activation.
//!
//! The worker owns one cache generation, named by the configured version
//! string. Install pre-populates it from the manifest, the interceptor
//! serves requests cache-first with selective write-back, and activation
//! reaps every generation except the current one. Bumping the version is
//! the only cache invalidation mechanism.

use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::CacheStore;
use crate::fetch::Fetcher;
use crate::http::{Destination, Request, Response};

/// Runtime hooks the worker calls into on lifecycle completion.
///
/// In a browser these would be `skipWaiting()` and `clients.claim()`; here
/// they are an explicit seam so tests can observe that the worker asked
/// for immediate takeover.
pub trait WorkerHost: Send + Sync {
  /// Called after install so the new version takes control without
  /// waiting for the previous one to wind down.
  fn skip_waiting(&self);

  /// Called after activation so open clients are handled by the new
  /// version without a reload.
  fn claim_clients(&self);
}

/// Host that just logs the lifecycle signals. Used by the CLI, which has
/// no client set to claim.
pub struct LoggingHost;

impl WorkerHost for LoggingHost {
  fn skip_waiting(&self) {
    info!("skip waiting: new worker version takes control immediately");
  }

  fn claim_clients(&self) {
    info!("claiming clients for the current worker version");
  }
}

/// Worker configuration, fixed at construction time.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
  /// Current cache generation identifier (e.g. "flag-game-v1.0.2")
  pub version: String,
  /// Origin that manifest paths resolve against
  pub origin: Url,
  /// Root-relative paths pre-fetched at install time
  pub manifest: Vec<String>,
  /// Path suffixes that qualify for runtime caching ("/" is always
  /// cacheable as an exact match)
  pub runtime_suffixes: Vec<String>,
}

impl WorkerConfig {
  /// Whether a response for this path should be written back into the
  /// cache after a successful network fetch.
  fn is_runtime_cacheable(&self, path: &str) -> bool {
    path == "/" || self.runtime_suffixes.iter().any(|s| path.ends_with(s.as_str()))
  }

  /// Resolve a root-relative manifest path against the origin.
  fn resolve(&self, path: &str) -> Result<Url> {
    self
      .origin
      .join(path)
      .map_err(|e| eyre!("Invalid manifest path {}: {}", path, e))
  }
}

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeSource {
  /// Found in the current cache generation; no network call
  Cache,
  /// Fetched from the network
  Network,
  /// Network failed; cached root page served as a best-effort offline page
  OfflineFallback,
}

/// A response produced by the interceptor.
pub struct ServedResponse {
  pub response: Response,
  pub source: ServeSource,
  /// Handle to the detached cache write-back, when one was started.
  ///
  /// The response is returned before the write completes; awaiting this
  /// handle is optional and exists so tests (and the CLI, before exit)
  /// can observe write completion deterministically. Write failures are
  /// logged inside the task and never surface here.
  pub write_back: Option<JoinHandle<()>>,
}

/// Outcome of running one request through the interceptor.
pub enum FetchOutcome {
  /// The request is not intercepted (non-GET or non-http scheme); it
  /// should proceed as if the worker did not exist.
  PassThrough,
  /// The worker produced a response.
  Served(ServedResponse),
}

/// The offline cache worker.
///
/// Generic over the cache store and the network fetcher so tests inject
/// an in-memory store and canned responses.
pub struct OfflineWorker<S, F> {
  config: WorkerConfig,
  store: Arc<S>,
  fetcher: Arc<F>,
  host: Arc<dyn WorkerHost>,
}

impl<S, F> OfflineWorker<S, F>
where
  S: CacheStore + 'static,
  F: Fetcher,
{
  pub fn new(
    config: WorkerConfig,
    store: Arc<S>,
    fetcher: Arc<F>,
    host: Arc<dyn WorkerHost>,
  ) -> Self {
    Self {
      config,
      store,
      fetcher,
      host,
    }
  }

  /// Install phase: pre-populate the current generation from the manifest.
  ///
  /// Each manifest entry is fetched and stored independently; a failing
  /// entry is logged and skipped so partial population still counts as a
  /// successful install. Completes by requesting immediate takeover.
  pub async fn install(&self) -> Result<()> {
    info!(version = %self.config.version, "installing worker");
    self.store.open_generation(&self.config.version)?;

    for path in &self.config.manifest {
      let request = match self.config.resolve(path) {
        Ok(url) => Request::get(url),
        Err(e) => {
          warn!(path = %path, error = %e, "skipping unresolvable manifest entry");
          continue;
        }
      };

      match self.fetcher.fetch(&request).await {
        Ok(response) if response.is_cacheable() => {
          debug!(path = %path, "caching manifest entry");
          if let Err(e) = self.store.put(
            &self.config.version,
            &request.cache_key(),
            request.url.as_str(),
            &response,
          ) {
            warn!(path = %path, error = %e, "failed to store manifest entry");
          }
        }
        Ok(response) => {
          warn!(path = %path, status = response.status, "manifest entry not cacheable");
        }
        Err(e) => {
          warn!(path = %path, error = %e, "manifest prefetch failed");
        }
      }
    }

    info!(version = %self.config.version, "install complete");
    self.host.skip_waiting();
    Ok(())
  }

  /// Fetch interception: cache-first, network fallback, selective
  /// write-back, offline fallback for document navigations.
  pub async fn handle_fetch(&self, request: &Request) -> Result<FetchOutcome> {
    // Only GET requests over http(s) are intercepted at all
    if !request.method.is_get() || !request.is_http() {
      return Ok(FetchOutcome::PassThrough);
    }

    let key = request.cache_key();

    if let Some(entry) = self.store.get(&self.config.version, &key)? {
      debug!(url = %request.url, cached_at = %entry.cached_at, "serving from cache");
      return Ok(FetchOutcome::Served(ServedResponse {
        response: entry.response,
        source: ServeSource::Cache,
        write_back: None,
      }));
    }

    match self.fetcher.fetch(request).await {
      Ok(response) => {
        let write_back = if response.is_cacheable()
          && self.config.is_runtime_cacheable(request.url.path())
        {
          Some(self.spawn_write_back(&key, request, &response))
        } else {
          None
        };

        Ok(FetchOutcome::Served(ServedResponse {
          response,
          source: ServeSource::Network,
          write_back,
        }))
      }
      Err(e) => {
        // Best-effort offline page for document navigations
        if request.destination == Destination::Document {
          let root = Request::get(self.config.resolve("/")?);
          if let Some(entry) = self.store.get(&self.config.version, &root.cache_key())? {
            warn!(url = %request.url, "network failed, serving cached offline page");
            return Ok(FetchOutcome::Served(ServedResponse {
              response: entry.response,
              source: ServeSource::OfflineFallback,
              write_back: None,
            }));
          }
        }
        Err(e)
      }
    }
  }

  /// Start the detached cache write for a qualifying network response.
  ///
  /// The caller gets its response copy immediately; this task writes the
  /// other copy and swallows failures after logging them.
  fn spawn_write_back(&self, key: &str, request: &Request, response: &Response) -> JoinHandle<()> {
    let store = Arc::clone(&self.store);
    let generation = self.config.version.clone();
    let key = key.to_string();
    let url = request.url.clone();
    let response = response.clone();

    tokio::spawn(async move {
      debug!(url = %url, "caching response");
      if let Err(e) = store.put(&generation, &key, url.as_str(), &response) {
        warn!(url = %url, error = %e, "failed to cache response");
      }
    })
  }

  /// Activation phase: delete every generation that is not the current
  /// one, then claim clients.
  ///
  /// Deletions run in parallel and are all awaited before activation is
  /// considered complete; the first failure is surfaced afterwards.
  pub async fn activate(&self) -> Result<()> {
    info!(version = %self.config.version, "activating worker");

    let stale: Vec<String> = self
      .store
      .generation_names()?
      .into_iter()
      .filter(|name| *name != self.config.version)
      .collect();

    let deletions = stale.into_iter().map(|name| {
      let store = Arc::clone(&self.store);
      async move {
        info!(generation = %name, "deleting stale cache generation");
        store.delete_generation(&name).map(|_| ())
      }
    });

    let results = futures::future::join_all(deletions).await;
    for result in results {
      result?;
    }

    info!(version = %self.config.version, "activation complete");
    self.host.claim_clients();
    Ok(())
  }
}
