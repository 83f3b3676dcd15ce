//! Typed calls to the Address/Tx HTTP service (§6): transaction lookup and
//! block lookup by height or hash, used by the Transfer Tracker (C8) and the
//! Block Scanner (C7) respectively. Shares the same re-probe-on-repeated-
//! failure discipline as [`super::ordinals::OrdinalsClient`] (§4.1).

use super::{
  retry::{retry_with_backoff, BackoffPolicy},
  types::{BlockDetails, TxDetails},
  Endpoints,
};
use crate::{adaptive::ConcurrencyManager, error::UpstreamError};
use reqwest::{header, StatusCode};
use std::sync::Arc;

pub struct TxClient {
  http: reqwest::Client,
  endpoints: Endpoints,
  concurrency: Arc<ConcurrencyManager>,
}

impl TxClient {
  pub fn new(http: reqwest::Client, endpoints: Endpoints, concurrency: Arc<ConcurrencyManager>) -> Self {
    Self { http, endpoints, concurrency }
  }

  fn base(&self) -> Result<String, UpstreamError> {
    self.endpoints.current().ok_or_else(|| UpstreamError::Transient {
      endpoint: "tx".to_string(),
      source: anyhow::anyhow!("no primary endpoint has been discovered yet"),
    })
  }

  async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, UpstreamError> {
    let endpoint = path.to_string();
    let policy = BackoffPolicy::upstream_default();
    let concurrency = self.concurrency.clone();
    let result = retry_with_backoff(
      &endpoint,
      policy,
      move |success, latency_ms| concurrency.record(success, latency_ms),
      || async {
        let base = self.base()?;
        let url = format!("{base}{path}");
        let response = self
          .http
          .get(&url)
          .header(header::ACCEPT, "application/json")
          .send()
          .await
          .map_err(|e| UpstreamError::Transient { endpoint: endpoint.clone(), source: e.into() })?;

        match response.status() {
          StatusCode::NOT_FOUND => Err(UpstreamError::NotFound { endpoint: endpoint.clone() }),
          StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(UpstreamError::Unauthorized { endpoint: endpoint.clone() })
          }
          status if status.is_server_error() => Err(UpstreamError::Transient {
            endpoint: endpoint.clone(),
            source: anyhow::anyhow!("server error {status}"),
          }),
          status if !status.is_success() => Err(UpstreamError::Malformed {
            endpoint: endpoint.clone(),
            reason: format!("unexpected status {status}"),
          }),
          _ => response
            .json::<T>()
            .await
            .map_err(|e| UpstreamError::Malformed { endpoint: endpoint.clone(), reason: e.to_string() }),
        }
      },
    )
    .await;
    self.endpoints.note_outcome(&self.http, &result).await;
    result
  }

  /// Same retry/classification discipline as [`Self::get_json`], but for an
  /// endpoint whose body is plain text rather than JSON (§6: `GET
  /// /block-height/{h}` "→ block hash (text/plain)").
  async fn get_text(&self, path: &str) -> Result<String, UpstreamError> {
    let endpoint = path.to_string();
    let policy = BackoffPolicy::upstream_default();
    let concurrency = self.concurrency.clone();
    let result = retry_with_backoff(
      &endpoint,
      policy,
      move |success, latency_ms| concurrency.record(success, latency_ms),
      || async {
        let base = self.base()?;
        let url = format!("{base}{path}");
        let response = self
          .http
          .get(&url)
          .header(header::ACCEPT, "text/plain")
          .send()
          .await
          .map_err(|e| UpstreamError::Transient { endpoint: endpoint.clone(), source: e.into() })?;

        match response.status() {
          StatusCode::NOT_FOUND => Err(UpstreamError::NotFound { endpoint: endpoint.clone() }),
          StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(UpstreamError::Unauthorized { endpoint: endpoint.clone() })
          }
          status if status.is_server_error() => Err(UpstreamError::Transient {
            endpoint: endpoint.clone(),
            source: anyhow::anyhow!("server error {status}"),
          }),
          status if !status.is_success() => Err(UpstreamError::Malformed {
            endpoint: endpoint.clone(),
            reason: format!("unexpected status {status}"),
          }),
          _ => response
            .text()
            .await
            .map(|body| body.trim().to_string())
            .map_err(|e| UpstreamError::Malformed { endpoint: endpoint.clone(), reason: e.to_string() }),
        }
      },
    )
    .await;
    self.endpoints.note_outcome(&self.http, &result).await;
    result
  }

  pub async fn tx(&self, txid: &str) -> Result<TxDetails, UpstreamError> {
    self.get_json(&format!("/tx/{txid}")).await
  }

  pub async fn block_height(&self) -> Result<u64, UpstreamError> {
    self.get_json("/blocks/tip/height").await
  }

  pub async fn block_hash_at(&self, height: u64) -> Result<String, UpstreamError> {
    self.get_text(&format!("/block-height/{height}")).await
  }

  pub async fn block(&self, hash: &str) -> Result<BlockDetails, UpstreamError> {
    self.get_json(&format!("/block/{hash}")).await
  }
}
