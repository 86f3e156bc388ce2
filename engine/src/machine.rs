//! The scan state machine (`spec.md` §4.1): drives the ledger adapter chunk-by-chunk, applies
//! each chunk's results to the store, and recovers from reorgs and ledger-contiguity loss.

use std::collections::HashSet;

use enote_crypto::{CryptoAdapter, KeyImage};

use crate::{
  chunk::{self, ChunkScanContext, LegacyScanMode},
  config::ScanConfig,
  error::{EngineError, EngineResult},
  events::EventSink,
  keys::{LegacyKeys, SeraphisKeys},
  ledger::LedgerAdapter,
  store::EnoteStore,
};

/// One full pass's outcome, returned so a caller driving the machine in a loop can decide whether
/// to call `scan` again (`spec.md` §4.1's `NEED_PARTIALSCAN`/`NEED_FULLSCAN` signals folded into
/// ordinary control flow rather than surfaced as distinct states, since this machine owns its own
/// retry policy).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ScanOutcome {
  /// The adapter reported no new blocks; scanning caught up to its tip.
  CaughtUp,
  /// The adapter signaled it wants scanning stopped.
  Aborted,
}

/// Runs the repeated "pull a chunk, process it, apply it" cycle against a [`LedgerAdapter`] and
/// an [`EnoteStore`], tracking the contiguity marker and reorg/retry counters `spec.md` §4.1
/// describes.
pub struct ScanMachine<'a> {
  config: ScanConfig,
  legacy_keys: Option<&'a LegacyKeys>,
  sp_keys: Option<&'a SeraphisKeys>,
  known_address_indices: Vec<u32>,
  owned_key_images: HashSet<KeyImage>,
  partialscan_attempts: u32,
  fullscan_attempts: u32,
}

impl<'a> ScanMachine<'a> {
  /// Construct a machine over the given key bundles, at least one of which must be present.
  pub fn new(config: ScanConfig, legacy_keys: Option<&'a LegacyKeys>, sp_keys: Option<&'a SeraphisKeys>) -> Self {
    Self {
      config,
      legacy_keys,
      sp_keys,
      known_address_indices: Vec::new(),
      owned_key_images: HashSet::new(),
      partialscan_attempts: 0,
      fullscan_attempts: 0,
    }
  }

  /// Seed the self-send candidate set from previously recovered state (e.g. after loading a
  /// persisted store), so a resumed scan doesn't have to rediscover every known address index and
  /// key image from scratch.
  pub fn seed_known_state(&mut self, address_indices: impl IntoIterator<Item = u32>, key_images: impl IntoIterator<Item = KeyImage>) {
    self.known_address_indices.extend(address_indices);
    self.owned_key_images.extend(key_images);
  }

  /// Run one scan pass: drain onchain chunks until the adapter reports no new blocks, then the
  /// non-ledger (mempool) chunk, re-entering the onchain loop once more afterwards to pick up
  /// anything the non-ledger scan caused to be promoted into a block (`spec.md` §4.1's "Non-ledger
  /// loop" bounded follow-up).
  pub fn scan(
    &mut self,
    crypto: &impl CryptoAdapter,
    adapter: &mut impl LedgerAdapter,
    store: &mut EnoteStore,
    sink: &mut impl EventSink,
  ) -> EngineResult<ScanOutcome> {
    let start = store.top_legacy_partialscanned.max(store.top_sp_scanned).map_or(store.refresh_index, |top| top + 1);
    adapter.begin_scanning_from_index(start, self.config.max_chunk_size_hint);
    log::info!("scan machine starting from block {start}");

    if self.drain_onchain(crypto, adapter, store, sink)? == ScanOutcome::Aborted {
      return Ok(ScanOutcome::Aborted);
    }

    // Bounds the loop below independently of `drain_onchain`'s own contiguity-retry counters
    // (which reset on every clean chunk, including the ones this loop pulls after a mempool-only
    // reorg signal that the adapter's actual chain never changes in response to).
    let mut mempool_reorg_retries = 0u32;

    loop {
      if adapter.is_aborted() {
        return Ok(ScanOutcome::Aborted);
      }

      let nonledger = adapter.get_nonledger_chunk();

      // `spec.md` §4.1's "Non-ledger loop": a mempool tx referencing a key image this store
      // already recorded as spent on-chain means the adapter's view of the chain moved (a reorg)
      // since the onchain loop above finished, not an ordinary new mempool spend.
      let reorg_index = nonledger
        .txs
        .iter()
        .flat_map(|tx| tx.input_key_images.iter())
        .filter_map(|(ki, _)| store.confirmed_onchain_index(ki))
        .min();
      if let Some(start_index) = reorg_index {
        mempool_reorg_retries += 1;
        if mempool_reorg_retries > self.config.max_partialscan_attempts {
          return Err(EngineError::LedgerContiguityLost { start_index });
        }
        log::warn!("non-ledger chunk references an already-onchain key image, treating as reorg");
        self.handle_reorg(store, adapter, sink, start_index)?;
        if self.drain_onchain(crypto, adapter, store, sink)? == ScanOutcome::Aborted {
          return Ok(ScanOutcome::Aborted);
        }
        continue;
      }

      let ctx = ChunkScanContext {
        legacy_keys: self.legacy_keys,
        sp_keys: self.sp_keys,
        known_address_indices: &self.known_address_indices,
        owned_key_images: &self.owned_key_images,
        config: &self.config,
        legacy_scan_mode: LegacyScanMode::Full,
      };
      let result = chunk::process_transactions(crypto, &ctx, &nonledger.txs, None, 0);
      self.absorb_discoveries(&result);
      store.apply_chunk_result(crypto, result, None, None, sink);
      break;
    }

    // Bounded follow-up (`spec.md` §4.1): run the onchain loop exactly once more, so a tx the
    // non-ledger scan just discovered but which was promoted into a block while we were scanning
    // the mempool doesn't sit unconfirmed in the store until the caller's next `scan()` call.
    if self.drain_onchain(crypto, adapter, store, sink)? == ScanOutcome::Aborted {
      return Ok(ScanOutcome::Aborted);
    }

    Ok(ScanOutcome::CaughtUp)
  }

  /// Drain onchain chunks until the adapter reports the chain tip (an empty chunk), recovering
  /// from contiguity loss along the way (`spec.md` §4.1 steps 2-5).
  fn drain_onchain(
    &mut self,
    crypto: &impl CryptoAdapter,
    adapter: &mut impl LedgerAdapter,
    store: &mut EnoteStore,
    sink: &mut impl EventSink,
  ) -> EngineResult<ScanOutcome> {
    loop {
      if adapter.is_aborted() {
        return Ok(ScanOutcome::Aborted);
      }

      let onchain = adapter.get_onchain_chunk();

      // Contiguity must be checked even when the chunk is empty (`spec.md` §4.1 steps 2 and 5,
      // in that order): a reorg that shortens the chain back to (or past) the machine's current
      // tip is invisible in the chunk's own contents and would otherwise only be caught once new
      // blocks grow past the old tip again.
      if let Err(_err) = self.verify_contiguity(store, onchain.start_index, onchain.prefix_block_id) {
        self.handle_reorg(store, adapter, sink, onchain.start_index)?;
        continue;
      }
      self.partialscan_attempts = 0;
      self.fullscan_attempts = 0;

      if onchain.is_empty() {
        return Ok(ScanOutcome::CaughtUp);
      }

      for (offset, block_txs) in onchain.block_txs.iter().enumerate() {
        let block_index = onchain.start_index + offset as u64;
        let block_id = onchain.block_ids[offset];
        let ctx = ChunkScanContext {
          legacy_keys: self.legacy_keys,
          sp_keys: self.sp_keys,
          known_address_indices: &self.known_address_indices,
          owned_key_images: &self.owned_key_images,
          config: &self.config,
          legacy_scan_mode: LegacyScanMode::Full,
        };
        let result = chunk::process_transactions(crypto, &ctx, block_txs, Some(block_index), 0);

        self.absorb_discoveries(&result);
        store.apply_chunk_result(crypto, result, Some(block_index), Some(block_index), sink);
        store.record_checkpoint(block_index, block_id, &self.config);
      }
    }
  }

  /// The shared `NEED_PARTIALSCAN`/`NEED_FULLSCAN` retry policy (`spec.md` §4.1), triggered by
  /// either onchain contiguity loss or a reorg detected via the non-ledger chunk.
  fn handle_reorg(
    &mut self,
    store: &mut EnoteStore,
    adapter: &mut impl LedgerAdapter,
    sink: &mut impl EventSink,
    start_index: u64,
  ) -> EngineResult<()> {
    self.partialscan_attempts += 1;
    if self.partialscan_attempts > self.config.max_partialscan_attempts {
      self.fullscan_attempts += 1;
      if self.fullscan_attempts > self.config.max_fullscan_attempts {
        return Err(EngineError::FullscanAttemptsExhausted { attempts: self.fullscan_attempts });
      }
      log::warn!("escalating to full rescan after repeated contiguity loss");
      store.pop_blocks(store.refresh_index.saturating_sub(1), sink);
      adapter.begin_scanning_from_index(store.refresh_index, self.config.max_chunk_size_hint);
      return Ok(());
    }

    let retry_from = start_index.saturating_sub(self.config.reorg_avoidance_increment).max(store.refresh_index);
    log::warn!("ledger contiguity lost at {start_index}, retrying from {retry_from}");
    store.pop_blocks(retry_from.saturating_sub(1), sink);
    adapter.begin_scanning_from_index(retry_from, self.config.max_chunk_size_hint);
    Ok(())
  }

  fn absorb_discoveries(&mut self, result: &chunk::ChunkResult) {
    for record in &result.sp_full {
      self.owned_key_images.insert(record.record.key_image);
      if !self.known_address_indices.contains(&record.record.address_index) {
        self.known_address_indices.push(record.record.address_index);
      }
    }
    for record in &result.legacy_full {
      self.owned_key_images.insert(record.record.key_image);
    }
  }

  fn verify_contiguity(&self, store: &EnoteStore, start_index: u64, prefix_block_id: [u8; 32]) -> EngineResult<()> {
    let Some(&expected) = store.checkpoint_cache.get(&start_index.wrapping_sub(1)) else {
      return Ok(());
    };
    if expected == prefix_block_id {
      Ok(())
    } else {
      Err(EngineError::LedgerContiguityLost { start_index })
    }
  }
}
