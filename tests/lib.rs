//! Integration tests exercising the real [`ordoverlay::upstream::Upstream`]
//! client against [`ordoverlay::test_support::StubUpstream`] fixtures,
//! covering the scenarios spec.md §8 names directly.

use ordoverlay::{
  pipeline::fetch,
  protocol::{bitmap, brc420::deploy, brc420::mint, parcel},
  store::models::{Bitmap, Deploy},
  test_support::{test_indexer, StubUpstreamBuilder},
};
use serde_json::json;

const SRC: &str = "src0000000000000000000000000000000000000000000000000000000000000i0";
const DEPLOY_ID: &str = "aaa0000000000000000000000000000000000000000000000000000000000000i0";

/// S1 — deploy happy path: `A` deploys over `SRC`, both held by the same
/// address, with a well-formed payload. Expected one Deploy row and one
/// Wallet row for the deployer.
#[tokio::test]
async fn deploy_happy_path_persists_deploy_and_wallet() {
  let stub = StubUpstreamBuilder::new()
    .json(format!("/inscription/{DEPLOY_ID}"), json!({"address": "bc1qX", "sat": null, "content_type": "application/json", "content_length": 80, "height": 792435, "timestamp": 0, "value": null, "fee": null}))
    .json(format!("/inscription/{SRC}"), json!({"address": "bc1qX", "sat": null, "content_type": "application/json", "content_length": 1, "height": 1, "timestamp": 0, "value": null, "fee": null}))
    .build()
    .await;
  let indexer = test_indexer(&stub).await;

  let payload: deploy::DeployPayload =
    serde_json::from_value(json!({"p": "brc-420", "op": "deploy", "id": SRC, "name": "FOO", "max": 100, "price": 0.001}))
      .unwrap();

  let outcome = deploy::validate(&indexer, DEPLOY_ID, 792_435, 0, &payload).await.unwrap();
  let record = outcome.into_valid().expect("deploy should validate");
  assert_eq!(record.source_id, SRC);
  assert_eq!(record.deployer_address, "bc1qX");
  assert_eq!(record.max_supply, 100);
  assert_eq!(record.price_sats, 100_000);

  let stored = indexer.store.deploy_by_source_id(SRC).unwrap().expect("deploy persisted");
  assert_eq!(stored.id, DEPLOY_ID);
}

/// S2 — mint with insufficient royalty: the deploy charges 0.001 BTC
/// (100,000 sats) but the mint transaction only pays 50,000. Expected: no
/// Mint row, and the outcome is a rule violation rather than an error.
#[tokio::test]
async fn mint_with_insufficient_royalty_is_rejected_without_a_store_row() {
  let mint_id = format!("{}i0", "m".repeat(64));
  let stub = StubUpstreamBuilder::new()
    .json(format!("/inscription/{mint_id}"), json!({"address": "bc1qY", "sat": null, "content_type": "application/json", "content_length": 1, "height": 792500, "timestamp": 0, "value": null, "fee": null}))
    .json(format!("/inscription/{SRC}"), json!({"address": "bc1qX", "sat": null, "content_type": "application/json", "content_length": 1, "height": 1, "timestamp": 0, "value": null, "fee": null}))
    .json(format!("/tx/{}", "m".repeat(64)), json!({"vout": [{"scriptpubkey_address": "bc1qX", "value": 50_000}]}))
    .build()
    .await;
  let indexer = test_indexer(&stub).await;

  indexer
    .store
    .insert_deploy(&Deploy {
      id: DEPLOY_ID.to_string(),
      source_id: SRC.to_string(),
      name: "FOO".to_string(),
      max_supply: 100,
      price_sats: 100_000,
      deployer_address: "bc1qX".to_string(),
      block_height: 792_435,
      timestamp: 0,
    })
    .unwrap();

  let outcome = mint::validate(&indexer, &mint_id, SRC, 792_500, 0).await.unwrap();
  assert!(!outcome.is_valid());
  assert!(indexer.store.count_mints_for_deploy(DEPLOY_ID).unwrap() == 0);
}

/// S3 — bitmap uniqueness: two claims for `792000.bitmap` in the same
/// block; the lexicographically lower inscription id wins regardless of
/// validation order.
#[tokio::test]
async fn bitmap_uniqueness_keeps_the_lexicographically_lowest_claimant() {
  let high_id = format!("{}i0", "z".repeat(64));
  let low_id = format!("{}i0", "a".repeat(64));
  let stub = StubUpstreamBuilder::new()
    .json(format!("/inscription/{high_id}"), json!({"address": "bc1qA", "sat": null, "content_type": "text/plain", "content_length": 11, "height": 792000, "timestamp": 0, "value": null, "fee": null}))
    .json(format!("/inscription/{low_id}"), json!({"address": "bc1qB", "sat": null, "content_type": "text/plain", "content_length": 11, "height": 792000, "timestamp": 0, "value": null, "fee": null}))
    .build()
    .await;
  let indexer = test_indexer(&stub).await;

  let first = bitmap::validate(&indexer, &high_id, "792000.bitmap", 792_000, 0).await.unwrap();
  assert!(first.is_valid());
  let second = bitmap::validate(&indexer, &low_id, "792000.bitmap", 792_000, 0).await.unwrap();
  assert!(second.is_valid());

  let winner = indexer.store.bitmap_by_number(792_000).unwrap().expect("a bitmap won");
  assert_eq!(winner.inscription_id, low_id);
}

/// S4 — parcel tie-breaker: a later-seen parcel at a lower height displaces
/// an earlier-seen parcel at a higher height for the same slot.
#[tokio::test]
async fn parcel_tie_breaker_prefers_the_lower_block_height() {
  let bitmap_id = format!("{}i0", "b".repeat(64));
  let p1 = format!("{}i0", "aaa".repeat(21));
  let p2 = format!("{}i0", "bbb".repeat(21));
  let stub = StubUpstreamBuilder::new()
    .json(format!("/children/{bitmap_id}"), json!({"ids": [p1, p2]}))
    .bytes("/block-height/792000", b"hash792000".to_vec())
    .json("/block/hash792000", json!({"tx_count": 100}))
    .json(format!("/inscription/{p1}"), json!({"address": "bc1qP1", "sat": null, "content_type": "text/plain", "content_length": 10, "height": 800000, "timestamp": 0, "value": null, "fee": null}))
    .json(format!("/inscription/{p2}"), json!({"address": "bc1qP2", "sat": null, "content_type": "text/plain", "content_length": 10, "height": 799999, "timestamp": 0, "value": null, "fee": null}))
    .build()
    .await;
  let indexer = test_indexer(&stub).await;

  indexer
    .store
    .claim_bitmap(&Bitmap {
      inscription_id: bitmap_id.clone(),
      bitmap_number: 792_000,
      content: "792000.bitmap".to_string(),
      address: "bc1qBitmap".to_string(),
      block_height: 792_000,
      timestamp: 0,
      sat: None,
      wallet: "bc1qBitmap".to_string(),
    })
    .unwrap();

  let outcome_p1 = parcel::validate(&indexer, &p1, "3.42.bitmap", 800_000, 0).await.unwrap();
  assert!(outcome_p1.is_valid());
  let outcome_p2 = parcel::validate(&indexer, &p2, "3.42.bitmap", 799_999, 0).await.unwrap();
  assert!(outcome_p2.is_valid());

  let winner = indexer.store.parcel_by_numbers(3, 42).unwrap().expect("a parcel won");
  assert_eq!(winner.inscription_id, p2);
}

/// S5 — pagination with duplicate-only pages: page 0 and page 1 repeat the
/// same 100 ids (an upstream bug), page 2 supplies the remaining 50.
/// Expected: exactly 150 unique ids.
#[tokio::test]
async fn pagination_dedups_repeated_pages() {
  let page: Vec<String> = (0..100).map(|i| format!("dup{i:03}i0")).collect();
  let tail: Vec<String> = (100..150).map(|i| format!("dup{i:03}i0")).collect();
  let stub = StubUpstreamBuilder::new()
    .json("/inscriptions/block/792000", json!({"ids": page, "more": true}))
    .json("/inscriptions/block/792000/1", json!({"ids": (0..100).map(|i| format!("dup{i:03}i0")).collect::<Vec<_>>(), "more": true}))
    .json("/inscriptions/block/792000/2", json!({"ids": tail, "more": false}))
    .build()
    .await;
  let indexer = test_indexer(&stub).await;

  let ids = fetch::fetch_all_ids(&indexer.upstream, 792_000).await.unwrap();
  assert_eq!(ids.len(), 150);
}

/// S6 — resume after crash: a block already marked processed is skipped by
/// the resume cursor, and the store carries no duplicate rows across a
/// second `resume_height` call.
#[tokio::test]
async fn resume_height_skips_past_already_processed_blocks() {
  let stub = StubUpstreamBuilder::new().build().await;
  let indexer = test_indexer(&stub).await;

  indexer.store.mark_block_processed(800_000, 0).unwrap();
  let resumed = indexer.store.resume_height(0).unwrap();
  assert_eq!(resumed, 800_001);

  let block = indexer.store.block(800_000).unwrap().expect("block row exists");
  assert!(block.processed);
}
