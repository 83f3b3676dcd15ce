//! Test-only fixtures, per SPEC_FULL.md §2.4. The teacher mocks an upstream
//! RPC collaborator with a real lightweight server process
//! (`test-bitcoincore-rpc`, built on `jsonrpc-http-server`) rather than a
//! hand-rolled mock trait; this crate follows the same shape but over plain
//! `tokio::net::TcpListener`, since the Ordinals/Tx services here speak
//! ordinary HTTP/JSON rather than JSON-RPC and pulling in a JSON-RPC server
//! crate for a handful of `GET` routes would add a dependency the rest of
//! the crate has no other use for.
//!
//! [`StubUpstream`] answers a fixed map of `path -> response` over real TCP
//! connections, so the production [`crate::upstream::Upstream`] client is
//! exercised unmodified in integration tests — no mock trait sits between
//! the code under test and the fixture.

use std::collections::HashMap;
use tokio::{
  io::{AsyncReadExt, AsyncWriteExt},
  net::TcpListener,
};

#[derive(Clone)]
enum StubResponse {
  Json(String),
  Bytes(Vec<u8>),
  NotFound,
}

pub struct StubUpstreamBuilder {
  routes: HashMap<String, StubResponse>,
}

impl StubUpstreamBuilder {
  pub fn new() -> Self {
    Self { routes: HashMap::new() }
  }

  /// Registers a JSON response for an exact path (e.g. `/blocks/tip/height`).
  pub fn json(mut self, path: impl Into<String>, value: serde_json::Value) -> Self {
    self.routes.insert(path.into(), StubResponse::Json(value.to_string()));
    self
  }

  /// Registers a raw-bytes response, used for `/content/<id>` fixtures.
  pub fn bytes(mut self, path: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
    self.routes.insert(path.into(), StubResponse::Bytes(body.into()));
    self
  }

  /// Registers an explicit 404, used to exercise `UpstreamError::NotFound`
  /// paths (e.g. a parcel's parent bitmap that was never claimed).
  pub fn not_found(mut self, path: impl Into<String>) -> Self {
    self.routes.insert(path.into(), StubResponse::NotFound);
    self
  }

  pub async fn build(self) -> StubUpstream {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub listener");
    let addr = listener.local_addr().expect("local addr");
    let routes = self.routes;

    let handle = tokio::spawn(async move {
      loop {
        let (mut socket, _) = match listener.accept().await {
          Ok(pair) => pair,
          Err(_) => return,
        };
        let routes = routes.clone();
        tokio::spawn(async move {
          let _ = serve_one(&mut socket, &routes).await;
        });
      }
    });

    StubUpstream { base_url: format!("http://{addr}"), handle }
  }
}

/// One running stub server. Aborted on drop so tests never leak listening
/// sockets across cases.
pub struct StubUpstream {
  pub base_url: String,
  handle: tokio::task::JoinHandle<()>,
}

impl Drop for StubUpstream {
  fn drop(&mut self) {
    self.handle.abort();
  }
}

async fn serve_one(
  socket: &mut tokio::net::TcpStream,
  routes: &HashMap<String, StubResponse>,
) -> std::io::Result<()> {
  let mut buf = vec![0u8; 8192];
  let n = socket.read(&mut buf).await?;
  let request = String::from_utf8_lossy(&buf[..n]);
  let path = request
    .lines()
    .next()
    .and_then(|line| line.split_whitespace().nth(1))
    .unwrap_or("/")
    .to_string();

  let response = match routes.get(&path) {
    Some(StubResponse::Json(body)) => {
      format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
      )
      .into_bytes()
    }
    Some(StubResponse::Bytes(body)) => {
      let header = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
      );
      let mut out = header.into_bytes();
      out.extend_from_slice(body);
      out
    }
    Some(StubResponse::NotFound) | None => {
      b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_vec()
    }
  };

  socket.write_all(&response).await?;
  socket.shutdown().await?;
  Ok(())
}

/// Builds an [`crate::indexer::Indexer`] wired against a [`StubUpstream`]
/// for both the Ordinals and Tx services, with an in-memory store (§2.4).
pub async fn test_indexer(stub: &StubUpstream) -> crate::indexer::Indexer {
  use crate::{
    adaptive::{BatchSizer, ConcurrencyManager},
    cache::PreviewCache,
    config::Config,
    indexer::Indexer,
    store::Store,
    upstream::{build_http_client, Endpoints, OrdinalsClient, TxClient, Upstream},
  };

  let config = Config::test_default();
  let store = Store::open(&config.db_path).expect("open in-memory store");

  let http = build_http_client();
  let cache = PreviewCache::new(config.cache_ttl_ms, config.cache_pressure_threshold, config.cache_emergency_mb);
  let concurrency =
    ConcurrencyManager::new(config.concurrency_min, config.concurrency_max, config.concurrency_initial);

  let ordinals_endpoints = Endpoints::new(vec![stub.base_url.clone()], None, true, "/");
  ordinals_endpoints.discover(&http).await.expect("discover ordinals");
  let tx_endpoints = Endpoints::new(vec![stub.base_url.clone()], None, true, "/");
  tx_endpoints.discover(&http).await.expect("discover tx");

  let ordinals = OrdinalsClient::new(http.clone(), ordinals_endpoints, concurrency.clone(), cache.clone());
  let tx = TxClient::new(http, tx_endpoints, concurrency.clone());
  let upstream = Upstream::new(ordinals, tx, cache, concurrency);

  Indexer::new(config, store, upstream).expect("construct indexer")
}

#[cfg(test)]
mod test {
  use super::*;

  #[tokio::test]
  async fn serves_registered_json_and_bytes_routes() {
    let stub = StubUpstreamBuilder::new()
      .json("/blocks/tip/height", serde_json::json!(825000))
      .bytes("/content/abc", b"hello".to_vec())
      .build()
      .await;

    let client = reqwest::Client::new();
    let height: u64 = client
      .get(format!("{}/blocks/tip/height", stub.base_url))
      .send()
      .await
      .unwrap()
      .json()
      .await
      .unwrap();
    assert_eq!(height, 825000);

    let body = client.get(format!("{}/content/abc", stub.base_url)).send().await.unwrap().bytes().await.unwrap();
    assert_eq!(&body[..], b"hello");
  }
}
