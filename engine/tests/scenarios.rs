//! The literal test scenarios of `spec.md` §8, each exercising the store/chunk-processing layer
//! directly against hand-built on-chain data.

mod common;

use std::collections::HashSet;

use enote_crypto::CryptoAdapter;
use enote_scan_engine::{
  chunk::{self, ChunkScanContext, LegacyScanMode},
  config::ScanConfig,
  context::{OriginStatus, SpentStatus},
  events::NullEventSink,
  store::{BalanceExclusions, BalanceFilter, EnoteStore},
};

use common::{
  legacy_coinbase_tx, legacy_tx_reusing_ko, legacy_tx_with_ko, legacy_wallet, legacy_wallet_view_only, sp_coinbase_tx,
  sp_self_send_tx, sp_wallet, CRYPTO,
};

fn onchain_unspent_filter() -> BalanceFilter {
  BalanceFilter {
    allowed_origin: HashSet::from([OriginStatus::Onchain]),
    allowed_spent: HashSet::from([SpentStatus::SpentOnchain]),
    exclusions: BalanceExclusions::default(),
  }
}

/// Feed one block's worth of transactions through the chunk processor and into the store, the
/// way `ScanMachine::scan` does per onchain block (`spec.md` §4.1 step 3-4).
fn scan_block(
  store: &mut EnoteStore,
  ctx: &ChunkScanContext<'_>,
  txs: &[enote_scan_engine::ledger::ChunkTx],
  block_index: u64,
) {
  let result = chunk::process_transactions(&CRYPTO, ctx, txs, Some(block_index), block_index * 1000);
  store.apply_chunk_result(&CRYPTO, result, Some(block_index), Some(block_index), &mut NullEventSink);
}

/// Scenario 1: a single seraphis coinbase enote of amount 1 in the genesis block.
#[test]
fn trivial_coinbase() {
  let wallet = sp_wallet(1);
  let config = ScanConfig::default();
  let mut store = EnoteStore::new(0, &config);

  let known_address_indices = Vec::new();
  let owned_key_images = HashSet::new();
  let ctx = ChunkScanContext {
    legacy_keys: None,
    sp_keys: Some(&wallet.keys),
    known_address_indices: &known_address_indices,
    owned_key_images: &owned_key_images,
    config: &config,
    legacy_scan_mode: LegacyScanMode::Full,
  };

  let tx = sp_coinbase_tx(1, &wallet.keys, 1, 0, 42);
  scan_block(&mut store, &ctx, &[tx], 0);

  assert_eq!(store.balance(&onchain_unspent_filter(), 0), 1);
}

/// Scenario 2: three blocks each send amount 1 to A; a reorg pops the last two and replaces them
/// with two amount-2 blocks. Final balance is `1 + 2 + 2 = 5`.
#[test]
fn reorg_and_replace() {
  let wallet = legacy_wallet(2);
  let config = ScanConfig::default();
  let mut store = EnoteStore::new(0, &config);

  let known_address_indices = Vec::new();
  let owned_key_images = HashSet::new();
  let ctx = ChunkScanContext {
    legacy_keys: Some(&wallet.keys),
    sp_keys: None,
    known_address_indices: &known_address_indices,
    owned_key_images: &owned_key_images,
    config: &config,
    legacy_scan_mode: LegacyScanMode::Full,
  };

  for i in 0 .. 3u8 {
    let tx = legacy_coinbase_tx(i, &wallet.keys, 1, 100 + u64::from(i));
    scan_block(&mut store, &ctx, &[tx], u64::from(i));
  }
  assert_eq!(store.balance(&onchain_unspent_filter(), 2), 3);

  // Pop blocks 1 and 2, keeping only block 0.
  store.pop_blocks(0, &mut NullEventSink);
  assert_eq!(store.balance(&onchain_unspent_filter(), 0), 1);

  for (offset, i) in (1u8 .. 3).enumerate() {
    let tx = legacy_coinbase_tx(100 + i, &wallet.keys, 2, 200 + offset as u64);
    scan_block(&mut store, &ctx, &[tx], u64::from(i));
  }

  assert_eq!(store.balance(&onchain_unspent_filter(), 2), 5);
}

/// Scenario 3: a locked enote becomes spendable only once its spendable age is reached.
#[test]
fn locked_enote_unlocks_after_spendable_age() {
  let wallet = legacy_wallet(3);
  let mut config = ScanConfig::default();
  config.default_spendable_age = 2;
  let mut store = EnoteStore::new(0, &config);

  let known_address_indices = Vec::new();
  let owned_key_images = HashSet::new();
  let ctx = ChunkScanContext {
    legacy_keys: Some(&wallet.keys),
    sp_keys: None,
    known_address_indices: &known_address_indices,
    owned_key_images: &owned_key_images,
    config: &config,
    legacy_scan_mode: LegacyScanMode::Full,
  };

  let tx = legacy_coinbase_tx(1, &wallet.keys, 1, 77);
  scan_block(&mut store, &ctx, &[tx], 0);

  let unlocked_filter = onchain_unspent_filter();
  let locked_filter =
    BalanceFilter { exclusions: BalanceExclusions { exclude_locked: true, ..Default::default() }, ..onchain_unspent_filter() };

  assert_eq!(store.balance(&locked_filter, 0), 0);
  assert_eq!(store.balance(&unlocked_filter, 0), 1);

  scan_block(&mut store, &ctx, &[], 1);
  scan_block(&mut store, &ctx, &[], 2);

  assert_eq!(store.balance(&locked_filter, 2), 1);
}

/// Scenario 4: a wallet churns its own balance through self-sends across many blocks; a fresh
/// store re-scanned from the whole history still reports the conserved total.
///
/// Every self-send here re-targets address index 0: the self-send pass can only resolve a
/// candidate drawn from `known_address_indices`, so a self-send to a never-before-seen index is
/// unrecoverable by construction (`spec.md` §4.2.3) — realistic churn reuses a change address.
#[test]
fn self_send_churn_preserves_balance() {
  let wallet = sp_wallet(4);
  let config = ScanConfig::default();

  let genesis = sp_coinbase_tx(0, &wallet.keys, 16, 0, 500);
  let mut blocks = vec![genesis];

  let mut store = EnoteStore::new(0, &config);
  let mut known_address_indices = Vec::new();
  let mut owned_key_images = HashSet::new();
  let mut prev_key_image = None;

  {
    let ctx = ChunkScanContext {
      legacy_keys: None,
      sp_keys: Some(&wallet.keys),
      known_address_indices: &known_address_indices,
      owned_key_images: &owned_key_images,
      config: &config,
      legacy_scan_mode: LegacyScanMode::Full,
    };
    let result = chunk::process_transactions(&CRYPTO, &ctx, &blocks, Some(0), 0);
    for record in &result.sp_full {
      owned_key_images.insert(record.record.key_image);
      if !known_address_indices.contains(&record.record.address_index) {
        known_address_indices.push(record.record.address_index);
      }
      prev_key_image = Some(record.record.key_image);
    }
    store.apply_chunk_result(&CRYPTO, result, Some(0), Some(0), &mut NullEventSink);
  }

  for i in 0 .. 12u8 {
    let block_index = blocks.len() as u64;
    let tx = sp_self_send_tx(10 + i, &wallet.keys, 16, 0, 600 + u64::from(i), prev_key_image.expect("a prior enote to spend"));
    blocks.push(tx.clone());

    let ctx = ChunkScanContext {
      legacy_keys: None,
      sp_keys: Some(&wallet.keys),
      known_address_indices: &known_address_indices,
      owned_key_images: &owned_key_images,
      config: &config,
      legacy_scan_mode: LegacyScanMode::Full,
    };
    let result = chunk::process_transactions(&CRYPTO, &ctx, &[tx], Some(block_index), 0);
    assert_eq!(result.sp_full.len(), 1, "iteration {i} should recover exactly its own self-send output");
    for record in &result.sp_full {
      owned_key_images.insert(record.record.key_image);
      if !known_address_indices.contains(&record.record.address_index) {
        known_address_indices.push(record.record.address_index);
      }
      prev_key_image = Some(record.record.key_image);
    }
    store.apply_chunk_result(&CRYPTO, result, Some(block_index), Some(block_index), &mut NullEventSink);
  }

  assert_eq!(store.balance(&onchain_unspent_filter(), blocks.len() as u64), 16);

  // A fresh store re-scanned from the recorded history end to end reaches the same total
  // (`spec.md` §8's reorg-idempotence property, P3), feeding owned_key_images/known_address_indices
  // forward block-by-block exactly as `ScanMachine::scan` does.
  let mut fresh_store = EnoteStore::new(0, &config);
  let mut fresh_known_address_indices = Vec::new();
  let mut fresh_owned_key_images = HashSet::new();
  for (index, tx) in blocks.iter().enumerate() {
    let ctx = ChunkScanContext {
      legacy_keys: None,
      sp_keys: Some(&wallet.keys),
      known_address_indices: &fresh_known_address_indices,
      owned_key_images: &fresh_owned_key_images,
      config: &config,
      legacy_scan_mode: LegacyScanMode::Full,
    };
    let result = chunk::process_transactions(&CRYPTO, &ctx, std::slice::from_ref(tx), Some(index as u64), 0);
    for record in &result.sp_full {
      fresh_owned_key_images.insert(record.record.key_image);
      if !fresh_known_address_indices.contains(&record.record.address_index) {
        fresh_known_address_indices.push(record.record.address_index);
      }
    }
    fresh_store.apply_chunk_result(&CRYPTO, result, Some(index as u64), Some(index as u64), &mut NullEventSink);
  }

  assert_eq!(fresh_store.balance(&onchain_unspent_filter(), blocks.len() as u64), 16);
}

/// Scenario 5: the two-phase legacy key-image import cycle.
#[test]
fn legacy_import_cycle_round_trip() {
  use enote_scan_engine::import_cycle::{finish_ki_import_cycle, import_legacy_key_images, make_ki_import_checkpoint};

  let view_only = legacy_wallet_view_only(5);
  let config = ScanConfig::default();
  let mut store = EnoteStore::new(0, &config);

  let known_address_indices = Vec::new();
  let owned_key_images = HashSet::new();
  let ctx = ChunkScanContext {
    legacy_keys: Some(&view_only.keys),
    sp_keys: None,
    known_address_indices: &known_address_indices,
    owned_key_images: &owned_key_images,
    config: &config,
    legacy_scan_mode: LegacyScanMode::Full,
  };

  let tx = legacy_coinbase_tx(1, &view_only.keys, 1, 321);
  let onetime_address = tx.outputs[0].onetime_address();
  scan_block(&mut store, &ctx, &[tx], 0);

  assert_eq!(store.legacy_intermediate_records.len(), 1);
  let intermediate_filter = BalanceFilter {
    exclusions: BalanceExclusions { exclude_intermediate: true, ..Default::default() },
    ..onchain_unspent_filter()
  };
  assert_eq!(store.balance(&intermediate_filter, 0), 0);

  // A spend-authority device derives the real key image: `x = enote_view_extension + spend_privkey`,
  // the same combination `chunk::process_transactions` uses when spend authority is present from
  // the start (`engine/src/chunk.rs`'s `one_time_privkey`), read off the pending intermediate
  // record rather than re-deriving the view-key math here.
  let enote_view_extension = store.legacy_intermediate_records.values().next().unwrap().record.enote_view_extension;
  let full_wallet = legacy_wallet(5);
  let one_time_privkey = enote_view_extension + full_wallet.keys.spend_privkey.unwrap();
  let key_image = CRYPTO.derive_key_image(one_time_privkey, onetime_address);

  let checkpoint = make_ki_import_checkpoint(&store);
  import_legacy_key_images(&mut store, &[(onetime_address, key_image)], &mut NullEventSink).unwrap();
  assert_eq!(finish_ki_import_cycle(&mut store, checkpoint), 0);

  assert_eq!(store.legacy_intermediate_records.len(), 0);
  assert_eq!(store.balance(&onchain_unspent_filter(), 0), 1);

  // Block 1 spends that key image; a key-images-only rescan should zero the balance.
  let spend_tx = enote_scan_engine::ledger::ChunkTx {
    tx_id: [2; 32],
    timestamp: 1000,
    extra_blob: vec![0u8; 33],
    outputs: Vec::new(),
    unlock_times: Vec::new(),
    input_key_images: vec![(key_image, enote_scan_engine::ledger::KeyImageProtocolTag::Legacy)],
  };
  let ki_only_ctx = ChunkScanContext {
    legacy_keys: Some(&view_only.keys),
    sp_keys: None,
    known_address_indices: &known_address_indices,
    owned_key_images: &owned_key_images,
    config: &config,
    legacy_scan_mode: LegacyScanMode::KeyImagesOnly,
  };
  scan_block(&mut store, &ki_only_ctx, &[spend_tx], 1);

  assert_eq!(store.balance(&onchain_unspent_filter(), 1), 0);
}

/// Scenario 6: two legacy enotes share a onetime address but carry different amounts; both are
/// retained until the shared key image appears, at which point only one can be spent.
#[test]
fn duplicate_onetime_address_different_amounts() {
  let wallet = legacy_wallet(6);
  let config = ScanConfig::default();
  let mut store = EnoteStore::new(0, &config);

  let known_address_indices = Vec::new();
  let owned_key_images = HashSet::new();
  let ctx = ChunkScanContext {
    legacy_keys: Some(&wallet.keys),
    sp_keys: None,
    known_address_indices: &known_address_indices,
    owned_key_images: &owned_key_images,
    config: &config,
    legacy_scan_mode: LegacyScanMode::Full,
  };

  let (tx0, ko) = legacy_tx_with_ko(1, &wallet.keys, 1, 111, 0);
  scan_block(&mut store, &ctx, &[tx0], 0);

  // Reuses the same ephemeral seed as `tx0`: the view-scan re-derives `Ko` from `D = k_v * R`, so
  // recovering the same one-time address a second time needs the same `R` the sender used the
  // first time, not merely the same on-chain bytes for `Ko`.
  let tx1 = legacy_tx_reusing_ko(2, &wallet.keys, ko, 2, 111);
  scan_block(&mut store, &ctx, &[tx1], 1);

  assert_eq!(store.legacy_records.len(), 2);
  assert_eq!(store.balance(&onchain_unspent_filter(), 1), 3);

  // This wallet has spend authority, so the chunk processor already computed the real key image
  // for both records when they were scanned; read it back rather than re-deriving it here.
  let key_image = store.legacy_records.values().next().unwrap().record.key_image;
  let spend_tx = enote_scan_engine::ledger::ChunkTx {
    tx_id: [9; 32],
    timestamp: 2000,
    extra_blob: vec![0u8; 33],
    outputs: Vec::new(),
    unlock_times: Vec::new(),
    input_key_images: vec![(key_image, enote_scan_engine::ledger::KeyImageProtocolTag::Legacy)],
  };
  scan_block(&mut store, &ctx, &[spend_tx], 2);

  assert_eq!(store.balance(&onchain_unspent_filter(), 2), 0);
}
