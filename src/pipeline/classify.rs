//! Preview classification (C5 step 3, spec.md §4.5). Design Note §9 replaces
//! "dynamic runtime dispatch by string `type`" with a tagged variant and an
//! exhaustive match — `InscriptionKind` below, consumed exhaustively by
//! `pipeline::dispatch`.

use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InscriptionKind {
  Brc420Deploy,
  Brc420Mint,
  Bitmap,
  Parcel,
  Binary,
  Json,
  Text,
  Unknown,
}

const DEPLOY_PREFIX: &[u8] = br#"{"p":"brc-420","op":"deploy""#;

static MINT_BODY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-f]{64}i\d+$").unwrap());
static BITMAP_BODY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:0|[1-9]\d*)$").unwrap());
static PARCEL_FULL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:0|[1-9]\d*)\.(?:0|[1-9]\d*)\.bitmap$").unwrap());

const BINARY_MAGICS: &[&[u8]] = &[b"\x89PNG", b"GIF87a", b"GIF89a", b"\xFF\xD8\xFF", b"BM", b"\x00\x00\x01\x00"];

/// Classifies a prefix (or the full content, if shorter than the prefix
/// length) per spec.md §4.5 step 3. Deliberately a pure function of the
/// bytes given it, matching §8's "classify(preview) is a function only of
/// the first 50 bytes and is deterministic" law.
pub fn classify_preview(bytes: &[u8]) -> InscriptionKind {
  if bytes.starts_with(DEPLOY_PREFIX) {
    return InscriptionKind::Brc420Deploy;
  }

  let text = String::from_utf8_lossy(bytes);
  let trimmed = text.trim();

  if let Some(rest) = trimmed.strip_prefix("/content/") {
    if MINT_BODY.is_match(rest) {
      return InscriptionKind::Brc420Mint;
    }
  }

  if let Some(leading) = trimmed.strip_suffix(".bitmap") {
    if BITMAP_BODY.is_match(leading) {
      return InscriptionKind::Bitmap;
    }
  }

  classify_other(bytes, trimmed)
}

/// Step 3's "otherwise" bucket: binary / json / text / unknown.
fn classify_other(bytes: &[u8], trimmed: &str) -> InscriptionKind {
  if bytes.contains(&0u8) || trimmed.contains('\u{FFFD}') {
    return InscriptionKind::Binary;
  }
  if BINARY_MAGICS.iter().any(|magic| bytes.starts_with(magic)) {
    return InscriptionKind::Binary;
  }
  if std::str::from_utf8(bytes).is_err() {
    return InscriptionKind::Unknown;
  }
  if (trimmed.starts_with('{') || trimmed.starts_with('[')) && serde_json::from_str::<serde_json::Value>(trimmed).is_ok()
  {
    return InscriptionKind::Json;
  }
  if trimmed.is_empty() {
    return InscriptionKind::Unknown;
  }
  InscriptionKind::Text
}

/// Parcel detection at the full-content stage (spec.md §4.5 step 3: "parcel
/// detected at full-content stage by the pattern `^\d+\.\d+\.bitmap$`").
/// Called for anything the preview stage classified as plain `Text`, since
/// the bitmap rule above never matches a two-segment `P.N.bitmap` body.
pub fn is_parcel_content(full_content: &str) -> bool {
  PARCEL_FULL.is_match(full_content.trim())
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn classifies_deploy_by_exact_prefix() {
    let content = br#"{"p":"brc-420","op":"deploy","id":"SRC","name":"FOO","max":100,"price":0.001}"#;
    assert_eq!(classify_preview(content), InscriptionKind::Brc420Deploy);
  }

  #[test]
  fn classifies_mint_by_content_reference() {
    let id = "0".repeat(64) + "i0";
    let content = format!("/content/{id}");
    assert_eq!(classify_preview(content.as_bytes()), InscriptionKind::Brc420Mint);
  }

  #[test]
  fn classifies_bitmap_by_suffix_and_canonical_leading_integer() {
    assert_eq!(classify_preview(b"792000.bitmap"), InscriptionKind::Bitmap);
    assert_eq!(classify_preview(b"0.bitmap"), InscriptionKind::Bitmap);
    assert_eq!(classify_preview(b"00792000.bitmap"), InscriptionKind::Text);
  }

  #[test]
  fn does_not_classify_parcel_shaped_content_as_bitmap() {
    assert_eq!(classify_preview(b"3.42.bitmap"), InscriptionKind::Text);
    assert!(is_parcel_content("3.42.bitmap"));
  }

  #[test]
  fn classifies_json_and_binary_and_unknown() {
    assert_eq!(classify_preview(b"{\"a\":1}"), InscriptionKind::Json);
    assert_eq!(classify_preview(b"\x89PNGrest"), InscriptionKind::Binary);
    assert_eq!(classify_preview(&[0xff, 0xfe, 0xfd]), InscriptionKind::Unknown);
    assert_eq!(classify_preview(b"hello world"), InscriptionKind::Text);
  }
}
