//! An in-memory [`LedgerAdapter`], grounded on the protocol's own `mock_ledger_context`: a flat
//! vector of blocks plus a separately-tracked unconfirmed pool, with no I/O and no persistence.
//! Exists for tests and for exercising [`crate::machine::ScanMachine`] without a real node.

use crate::{
  context::TxId,
  ledger::{ChunkTx, LedgerAdapter, LedgerChunk, NonLedgerChunk},
};

/// A single mock block: an id plus the transactions it contains.
#[derive(Clone, Debug)]
pub struct MockBlock {
  /// The block's id (arbitrary in this mock; real adapters hash the block header).
  pub id: [u8; 32],
  /// The block's transactions.
  pub txs: Vec<ChunkTx>,
}

/// An in-memory ledger: a growable chain of [`MockBlock`]s plus an unconfirmed pool.
#[derive(Default)]
pub struct MockLedger {
  blocks: Vec<MockBlock>,
  unconfirmed: Vec<ChunkTx>,
  cursor: u64,
  chunk_size_hint: u64,
  aborted: bool,
}

impl MockLedger {
  /// An empty mock ledger.
  pub fn new() -> Self {
    Self { chunk_size_hint: 1, ..Self::default() }
  }

  /// Append a block, returning its index.
  pub fn push_block(&mut self, id: [u8; 32], txs: Vec<ChunkTx>) -> u64 {
    self.blocks.push(MockBlock { id, txs });
    self.blocks.len() as u64 - 1
  }

  /// Drop every block from `from_index` onward, simulating a reorg.
  pub fn pop_blocks(&mut self, from_index: u64) {
    self.blocks.truncate(from_index as usize);
  }

  /// Replace the unconfirmed pool's contents.
  pub fn set_unconfirmed(&mut self, txs: Vec<ChunkTx>) {
    self.unconfirmed = txs;
  }

  /// Drop a transaction from the unconfirmed pool, simulating it either confirming or being
  /// evicted.
  pub fn remove_unconfirmed(&mut self, tx_id: TxId) {
    self.unconfirmed.retain(|tx| tx.tx_id != tx_id);
  }

  /// Force the next `is_aborted` check to return true.
  pub fn abort(&mut self) {
    self.aborted = true;
  }

  /// The id of the block immediately before `index`, or the all-zero id if `index` is 0.
  fn prefix_id_for(&self, index: u64) -> [u8; 32] {
    if index == 0 {
      [0; 32]
    } else {
      self.blocks.get(index as usize - 1).map_or([0; 32], |block| block.id)
    }
  }
}

impl LedgerAdapter for MockLedger {
  fn begin_scanning_from_index(&mut self, start: u64, max_chunk_size_hint: u64) {
    self.cursor = start;
    self.chunk_size_hint = max_chunk_size_hint.max(1);
  }

  fn get_onchain_chunk(&mut self) -> LedgerChunk {
    let prefix_block_id = self.prefix_id_for(self.cursor);
    let end = (self.cursor + self.chunk_size_hint).min(self.blocks.len() as u64);
    if self.cursor >= end {
      return LedgerChunk { start_index: self.cursor, prefix_block_id, block_ids: Vec::new(), block_txs: Vec::new() };
    }

    let start_index = self.cursor;
    let mut block_ids = Vec::new();
    let mut block_txs = Vec::new();
    for block in &self.blocks[self.cursor as usize .. end as usize] {
      block_ids.push(block.id);
      block_txs.push(block.txs.clone());
    }
    self.cursor = end;

    LedgerChunk { start_index, prefix_block_id, block_ids, block_txs }
  }

  fn get_nonledger_chunk(&mut self) -> NonLedgerChunk {
    let prefix_block_id = self.blocks.last().map_or([0; 32], |block| block.id);
    NonLedgerChunk { prefix_block_id, txs: self.unconfirmed.clone() }
  }

  fn terminate_scanning(&mut self) {
    self.aborted = true;
  }

  fn is_aborted(&self) -> bool {
    self.aborted
  }
}
