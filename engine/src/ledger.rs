//! The ledger adapter (`spec.md` §6, "Ledger adapter") and the chunk shapes it returns.

use enote_crypto::KeyImage;

use crate::{context::TxId, enote::EnoteVariant};

/// Which protocol a key image was carried as an input under.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum KeyImageProtocolTag {
  /// The key image was a legacy-tx input.
  Legacy,
  /// The key image was a seraphis-tx input, and that tx was not itself a self-send.
  SeraphisNonSelfSend,
  /// The key image was a seraphis-tx input, and that tx was a self-send.
  SeraphisSelfSend,
}

/// One transaction's worth of data within a chunk.
#[derive(Clone, Debug)]
pub struct ChunkTx {
  /// The transaction id.
  pub tx_id: TxId,
  /// The block timestamp (or 0 for non-ledger txs).
  pub timestamp: u64,
  /// The raw memo/extra blob: carries the main and any additional ephemeral pubkeys.
  pub extra_blob: Vec<u8>,
  /// The transaction's outputs, in order.
  pub outputs: Vec<EnoteVariant>,
  /// Per-output unlock times, parallel to `outputs` (defaults to 0, i.e. always unlocked once
  /// `default_spendable_age` alone is satisfied).
  pub unlock_times: Vec<u64>,
  /// Every key image this transaction spends, tagged by the protocol/self-send status it was
  /// observed under (`spec.md` §4.2.4).
  pub input_key_images: Vec<(KeyImage, KeyImageProtocolTag)>,
}

/// A chunk of confirmed on-chain data (`spec.md` §6).
#[derive(Clone, Debug)]
pub struct LedgerChunk {
  /// The first block index this chunk covers.
  pub start_index: u64,
  /// The block id immediately preceding `start_index`, used to validate contiguity against the
  /// scan machine's marker.
  pub prefix_block_id: [u8; 32],
  /// The id of each block covered, in order. Empty means "at chain tip": no blocks followed
  /// `start_index`.
  pub block_ids: Vec<[u8; 32]>,
  /// Per-block transactions, parallel to `block_ids`.
  pub block_txs: Vec<Vec<ChunkTx>>,
}

impl LedgerChunk {
  /// Whether this chunk reported no new blocks (i.e. the ledger adapter believes it's at tip).
  pub fn is_empty(&self) -> bool {
    self.block_ids.is_empty()
  }

  /// The id of this chunk's last block, if any.
  pub fn last_block_id(&self) -> Option<[u8; 32]> {
    self.block_ids.last().copied()
  }

  /// The block index of this chunk's last block, if any.
  pub fn last_block_index(&self) -> Option<u64> {
    if self.block_ids.is_empty() {
      None
    } else {
      Some(self.start_index + self.block_ids.len() as u64 - 1)
    }
  }
}

/// A chunk of not-yet-confirmed (mempool/offchain) data (`spec.md` §6).
#[derive(Clone, Debug)]
pub struct NonLedgerChunk {
  /// The block id the adapter currently considers its tip.
  pub prefix_block_id: [u8; 32],
  /// The unconfirmed transactions currently visible.
  pub txs: Vec<ChunkTx>,
}

/// The external ledger the scan machine pulls chunks from.
///
/// Every method may observe I/O; the scan machine never retries internally on error, it only
/// reacts to `is_aborted`.
pub trait LedgerAdapter {
  /// Begin (or restart) a scanning session from `start`. A no-op for adapters without a cursor
  /// concept.
  fn begin_scanning_from_index(&mut self, start: u64, max_chunk_size_hint: u64);

  /// Fetch the next confirmed chunk starting at the index passed to
  /// `begin_scanning_from_index` (or the index implied by prior calls).
  fn get_onchain_chunk(&mut self) -> LedgerChunk;

  /// Fetch the current unconfirmed/mempool chunk.
  fn get_nonledger_chunk(&mut self) -> NonLedgerChunk;

  /// Signal that the caller no longer wants chunks; subsequent calls are unspecified.
  fn terminate_scanning(&mut self);

  /// Whether the adapter wants the current scan session aborted.
  fn is_aborted(&self) -> bool;
}
