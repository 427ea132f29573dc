mod cache;
mod config;
mod fetch;
mod http;
mod worker;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

use cache::SqliteStore;
use config::Config;
use fetch::HttpFetcher;
use http::{Method, Request};
use worker::{FetchOutcome, LoggingHost, OfflineWorker, ServeSource};

#[derive(Parser, Debug)]
#[command(name = "ocw")]
#[command(about = "Offline cache worker: install, serve, and prune cached web assets")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/ocw/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Pre-fetch the manifest into the current cache generation
  Install,
  /// Run one request through the interceptor and print the response body
  Fetch {
    /// Absolute URL or root-relative path (resolved against the origin)
    url: String,
    /// Treat the request as a document navigation (enables the offline
    /// fallback to the cached root page)
    #[arg(long)]
    document: bool,
    /// Request method; anything but GET passes through uncached
    #[arg(long, default_value = "GET")]
    method: String,
  },
  /// Delete every cache generation except the current one
  Activate,
  /// List cache generation names present in the store
  Generations,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  // Logs go to stderr so `fetch` output on stdout stays clean
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();
  let config = Config::load(args.config.as_deref())?;

  let store = match &config.cache.db_path {
    Some(path) => SqliteStore::open_at(path)?,
    None => SqliteStore::open()?,
  };
  let store = Arc::new(store);

  let worker = OfflineWorker::new(
    config.worker_config(),
    Arc::clone(&store),
    Arc::new(HttpFetcher::new(config.origin.clone())?),
    Arc::new(LoggingHost),
  );

  match args.command {
    Command::Install => worker.install().await,
    Command::Activate => worker.activate().await,
    Command::Fetch {
      url,
      document,
      method,
    } => {
      let request = build_request(&config, &url, document, &method)?;
      run_fetch(&worker, &request).await
    }
    Command::Generations => {
      use cache::CacheStore;
      for name in store.generation_names()? {
        println!("{}", name);
      }
      Ok(())
    }
  }
}

/// Build the request for the `fetch` subcommand. Root-relative paths are
/// resolved against the configured origin.
fn build_request(config: &Config, url: &str, document: bool, method: &str) -> Result<Request> {
  let url = if url.starts_with('/') {
    config.origin.join(url)?
  } else {
    Url::parse(url)?
  };

  let mut request = Request::get(url);
  request.method = Method::parse(method);
  Ok(if document { request.document() } else { request })
}

async fn run_fetch<S, F>(worker: &OfflineWorker<S, F>, request: &Request) -> Result<()>
where
  S: cache::CacheStore + 'static,
  F: fetch::Fetcher,
{
  match worker.handle_fetch(request).await? {
    FetchOutcome::PassThrough => {
      info!(url = %request.url, "request not intercepted");
      Ok(())
    }
    FetchOutcome::Served(served) => {
      let source = match served.source {
        ServeSource::Cache => "cache",
        ServeSource::Network => "network",
        ServeSource::OfflineFallback => "offline-fallback",
      };
      let content_type = served.response.header("content-type").unwrap_or("unknown");
      info!(
        url = %request.url,
        status = served.response.status,
        source,
        content_type,
        "served"
      );

      std::io::stdout().write_all(&served.response.body)?;

      // Let the detached cache write finish before the process exits
      if let Some(write_back) = served.write_back {
        let _ = write_back.await;
      }
      Ok(())
    }
  }
}
