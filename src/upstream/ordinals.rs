//! Typed calls to the Ordinals HTTP service (§6): inscriptions-in-block
//! pagination, inscription details, content (with range support) and
//! children. Every call goes through the shared retry combinator, records
//! `(success, latency_ms)` into the Concurrency Manager, and feeds its
//! outcome to [`Endpoints::note_outcome`] so repeated transient failures
//! trigger re-discovery (§4.1).

use super::{
  retry::{retry_with_backoff, BackoffPolicy},
  types::{ChildrenResponse, InscriptionDetails, InscriptionsInBlockPage},
  Endpoints,
};
use crate::{adaptive::ConcurrencyManager, cache::PreviewCache, error::UpstreamError};
use reqwest::{header, StatusCode};
use std::sync::Arc;

pub struct OrdinalsClient {
  http: reqwest::Client,
  endpoints: Endpoints,
  concurrency: Arc<ConcurrencyManager>,
  cache: Arc<PreviewCache>,
}

impl OrdinalsClient {
  pub fn new(
    http: reqwest::Client,
    endpoints: Endpoints,
    concurrency: Arc<ConcurrencyManager>,
    cache: Arc<PreviewCache>,
  ) -> Self {
    Self { http, endpoints, concurrency, cache }
  }

  fn base(&self) -> Result<String, UpstreamError> {
    self.endpoints.current().ok_or_else(|| UpstreamError::Transient {
      endpoint: "ordinals".to_string(),
      source: anyhow::anyhow!("no primary endpoint has been discovered yet"),
    })
  }

  async fn get_json<T: serde::de::DeserializeOwned>(
    &self,
    path: &str,
  ) -> Result<T, UpstreamError> {
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

  pub async fn inscriptions_in_block(
    &self,
    height: u64,
    page: u64,
  ) -> Result<InscriptionsInBlockPage, UpstreamError> {
    let path = if page == 0 {
      format!("/inscriptions/block/{height}")
    } else {
      format!("/inscriptions/block/{height}/{page}")
    };
    self.get_json(&path).await
  }

  pub async fn inscription(&self, id: &str) -> Result<InscriptionDetails, UpstreamError> {
    if let Some(cached) = self.cache.get(&crate::cache::details_key(id)) {
      if let Ok(details) = serde_json::from_slice::<InscriptionDetails>(&cached) {
        return Ok(details);
      }
    }
    let details: InscriptionDetails = self.get_json(&format!("/inscription/{id}")).await?;
    if let Ok(bytes) = serde_json::to_vec(&details) {
      self.cache.put(crate::cache::details_key(id), bytes);
    }
    Ok(details)
  }

  pub async fn children(&self, id: &str) -> Result<Vec<String>, UpstreamError> {
    let response: ChildrenResponse = self.get_json(&format!("/children/{id}")).await?;
    Ok(response.ids)
  }

  /// Fetches the first `len` bytes of content, preferring a `Range` request
  /// and falling back to a full fetch when the upstream ignores it (§4.2,
  /// §4.5 step 3: "range request preferred, full-content fallback").
  pub async fn content_prefix(&self, id: &str, len: usize) -> Result<Vec<u8>, UpstreamError> {
    let cache_key = crate::cache::preview_key(id);
    if let Some(cached) = self.cache.get(&cache_key) {
      return Ok(cached);
    }
    let bytes = self.content_bytes(id, Some(len)).await?;
    let prefix: Vec<u8> = bytes.into_iter().take(len).collect();
    self.cache.put(cache_key, prefix.clone());
    Ok(prefix)
  }

  pub async fn content_full(&self, id: &str) -> Result<Vec<u8>, UpstreamError> {
    let cache_key = crate::cache::content_key(id);
    if let Some(cached) = self.cache.get(&cache_key) {
      return Ok(cached);
    }
    let bytes = self.content_bytes(id, None).await?;
    self.cache.put(cache_key, bytes.clone());
    Ok(bytes)
  }

  async fn content_bytes(&self, id: &str, range_len: Option<usize>) -> Result<Vec<u8>, UpstreamError> {
    let endpoint = format!("/content/{id}");
    let policy = BackoffPolicy::upstream_default();
    let concurrency = self.concurrency.clone();
    let result = retry_with_backoff(
      &endpoint,
      policy,
      move |success, latency_ms| concurrency.record(success, latency_ms),
      || async {
        let base = self.base()?;
        let url = format!("{base}{endpoint}");
        let mut request = self.http.get(&url).header(header::ACCEPT, "text/plain");
        if let Some(len) = range_len {
          request = request.header(header::RANGE, format!("bytes=0-{}", len.saturating_sub(1)));
        }
        let response = request
          .send()
          .await
          .map_err(|e| UpstreamError::Transient { endpoint: endpoint.clone(), source: e.into() })?;

        match response.status() {
          StatusCode::NOT_FOUND => Err(UpstreamError::NotFound { endpoint: endpoint.clone() }),
          status if status.is_server_error() => Err(UpstreamError::Transient {
            endpoint: endpoint.clone(),
            source: anyhow::anyhow!("server error {status}"),
          }),
          status if !status.is_success() && status != StatusCode::PARTIAL_CONTENT => {
            Err(UpstreamError::Malformed {
              endpoint: endpoint.clone(),
              reason: format!("unexpected status {status}"),
            })
          }
          _ => response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| UpstreamError::Malformed { endpoint: endpoint.clone(), reason: e.to_string() }),
        }
      },
    )
    .await;
    self.endpoints.note_outcome(&self.http, &result).await;
    result
  }
}

