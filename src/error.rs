//! Crate-level error taxonomy. Layered the way `brc20::Error<L>` wraps a
//! domain-specific error inside a generic one: here the domain layer is the
//! upstream HTTP client (§4.1, §7) and the store (§4.3).

use std::fmt;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("upstream error: {0}")]
  Upstream(#[from] UpstreamError),

  #[error("store error: {0}")]
  Store(#[from] StoreError),

  #[error(transparent)]
  Other(#[from] anyhow::Error),
}

/// Classification of upstream call outcomes, per spec.md §4.1 and §7.
/// `NotFound` is deliberately not retried and never counts as an error for
/// retry-threshold purposes — it is a negative result.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
  #[error("transient upstream failure calling {endpoint}: {source}")]
  Transient {
    endpoint: String,
    #[source]
    source: anyhow::Error,
  },

  #[error("not found: {endpoint}")]
  NotFound { endpoint: String },

  #[error("malformed payload from {endpoint}: {reason}")]
  Malformed { endpoint: String, reason: String },

  #[error("unauthorized calling {endpoint}")]
  Unauthorized { endpoint: String },
}

impl UpstreamError {
  /// Transient failures are retried (§4.1); every other kind is terminal
  /// for the current attempt.
  pub fn is_transient(&self) -> bool {
    matches!(self, UpstreamError::Transient { .. })
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, UpstreamError::NotFound { .. })
  }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("invariant violation: {0}")]
  Invariant(String),
}

/// Result of running a protocol validator (§4.6.5): a rule failure is not an
/// error, it is a value. Only upstream/store failures propagate as `Err`.
pub enum Outcome<T> {
  Valid(T),
  Invalid(Reason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reason(pub String);

impl fmt::Display for Reason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl Reason {
  pub fn new(msg: impl Into<String>) -> Self {
    Self(msg.into())
  }
}

impl<T> Outcome<T> {
  pub fn is_valid(&self) -> bool {
    matches!(self, Outcome::Valid(_))
  }

  pub fn into_valid(self) -> Option<T> {
    match self {
      Outcome::Valid(t) => Some(t),
      Outcome::Invalid(_) => None,
    }
  }

  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
    match self {
      Outcome::Valid(t) => Outcome::Valid(f(t)),
      Outcome::Invalid(reason) => Outcome::Invalid(reason),
    }
  }
}
