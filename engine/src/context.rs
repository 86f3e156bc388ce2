//! Origin and spent context records (`spec.md` §3.3).

/// A transaction identifier, as seen by the ledger adapter.
pub type TxId = [u8; 32];

/// A block index that may instead denote "this hasn't happened on-chain".
///
/// `spec.md` §9 flags the source's `-1`-as-`u64` sentinel for unconfirmed blocks as a bug this
/// specification deliberately does not reproduce; this sum type is the replacement.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub enum BlockIndex {
  /// The enote/spend was observed at this on-chain block.
  Confirmed(u64),
  /// The enote/spend has not (yet) been observed on-chain.
  Unconfirmed,
}

impl BlockIndex {
  /// The on-chain block index, if any.
  pub fn confirmed(self) -> Option<u64> {
    match self {
      Self::Confirmed(index) => Some(index),
      Self::Unconfirmed => None,
    }
  }

  /// Whether this index is at or before `tip` (unconfirmed never is).
  pub fn is_at_or_before(self, tip: u64) -> bool {
    matches!(self, Self::Confirmed(index) if index <= tip)
  }

  /// Whether this index is at or after `floor` (unconfirmed never is, since it has no position).
  pub fn is_at_or_after(self, floor: u64) -> bool {
    matches!(self, Self::Confirmed(index) if index >= floor)
  }
}

/// Where an enote was seen: still in the mempool, seen off-chain (e.g. a local-only tx), or
/// confirmed on-chain.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub enum OriginStatus {
  /// Observed outside any ledger the scan machine has visited (e.g. a manually imported tx).
  Offchain,
  /// Observed in the unconfirmed (mempool) chunk.
  Unconfirmed,
  /// Observed in a confirmed block.
  Onchain,
}

impl OriginStatus {
  /// The total order `ONCHAIN > UNCONFIRMED > OFFCHAIN` used by `try_update_origin_context`
  /// (`spec.md` §4.3.1).
  fn rank(self) -> u8 {
    match self {
      Self::Offchain => 0,
      Self::Unconfirmed => 1,
      Self::Onchain => 2,
    }
  }

  /// Whether `self` is at least as strong as `other`.
  pub fn supersedes_or_equals(self, other: Self) -> bool {
    self.rank() >= other.rank()
  }
}

/// Whether an enote's key image has (yet) appeared, and where.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub enum SpentStatus {
  /// No key image has been observed for this enote.
  Unspent,
  /// The spending key image was observed off-chain.
  SpentOffchain,
  /// The spending key image was observed in the unconfirmed chunk.
  SpentUnconfirmed,
  /// The spending key image was observed in a confirmed block.
  SpentOnchain,
}

impl SpentStatus {
  fn rank(self) -> u8 {
    match self {
      Self::Unspent => 0,
      Self::SpentOffchain => 1,
      Self::SpentUnconfirmed => 2,
      Self::SpentOnchain => 3,
    }
  }

  /// Whether `self` is at least as strong as `other`.
  pub fn supersedes_or_equals(self, other: Self) -> bool {
    self.rank() >= other.rank()
  }

  /// Whether this status counts as "spent" for the purposes of a balance query's spent mask.
  pub fn is_spent(self) -> bool {
    !matches!(self, Self::Unspent)
  }
}

/// Where and when an enote was seen (`spec.md` §3.3).
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct OriginContext {
  /// The block the enote was seen in, or `Unconfirmed`.
  pub block_index: BlockIndex,
  /// The timestamp of that block (meaningless when `block_index` is `Unconfirmed`).
  pub block_timestamp: u64,
  /// The transaction that created the enote.
  pub tx_id: TxId,
  /// The enote's index within that transaction's outputs.
  pub enote_tx_index: u64,
  /// The enote's index within the protocol's global output ledger, if known.
  pub enote_ledger_index: Option<u64>,
  /// Derived from `block_index`, but tracked independently so off-chain/unconfirmed/on-chain can
  /// be distinguished even once a block index is later learned (`spec.md` §3.3).
  pub origin_status: OriginStatus,
  /// The transaction's raw memo/extra blob, retained for payment-ID/arbitrary-data decoding.
  pub memo_blob: Vec<u8>,
}

impl OriginContext {
  /// Construct a context for an enote observed in confirmed block `block_index`.
  pub fn onchain(
    block_index: u64,
    block_timestamp: u64,
    tx_id: TxId,
    enote_tx_index: u64,
    memo_blob: Vec<u8>,
  ) -> Self {
    Self {
      block_index: BlockIndex::Confirmed(block_index),
      block_timestamp,
      tx_id,
      enote_tx_index,
      enote_ledger_index: None,
      origin_status: OriginStatus::Onchain,
      memo_blob,
    }
  }

  /// Construct a context for an enote observed in the unconfirmed (mempool) chunk.
  pub fn unconfirmed(tx_id: TxId, enote_tx_index: u64, memo_blob: Vec<u8>) -> Self {
    Self {
      block_index: BlockIndex::Unconfirmed,
      block_timestamp: 0,
      tx_id,
      enote_tx_index,
      enote_ledger_index: None,
      origin_status: OriginStatus::Unconfirmed,
      memo_blob,
    }
  }

  /// `try_update_origin_context` (`spec.md` §4.3.1): strictly-stronger status wins; within the
  /// same status, the earlier sighting (lower block index, then lower tx id) wins. Returns
  /// whether `current` was replaced by `candidate`.
  pub fn try_update(current: &mut Self, candidate: Self) -> bool {
    if candidate.origin_status.rank() > current.origin_status.rank() {
      *current = candidate;
      return true;
    }
    if candidate.origin_status != current.origin_status {
      return false;
    }
    let replace = match (candidate.block_index, current.block_index) {
      (BlockIndex::Confirmed(new), BlockIndex::Confirmed(cur)) => {
        new < cur || (new == cur && candidate.tx_id < current.tx_id)
      }
      _ => false,
    };
    if replace {
      *current = candidate;
    }
    replace
  }
}

/// If and when an enote's key image appeared (`spec.md` §3.3).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SpentContext {
  /// The block the key image was seen in, or `Unconfirmed`; meaningless when `spent_status` is
  /// `Unspent`.
  pub block_index: BlockIndex,
  /// The timestamp of that block.
  pub block_timestamp: u64,
  /// The transaction whose inputs carried the key image.
  pub tx_id: TxId,
  /// Derived from `block_index`.
  pub spent_status: SpentStatus,
}

impl SpentContext {
  /// The context of an as-yet-unspent enote.
  pub fn unspent() -> Self {
    Self {
      block_index: BlockIndex::Unconfirmed,
      block_timestamp: 0,
      tx_id: [0; 32],
      spent_status: SpentStatus::Unspent,
    }
  }

  /// Construct a context for a key image observed in confirmed block `block_index`.
  pub fn onchain(block_index: u64, block_timestamp: u64, tx_id: TxId) -> Self {
    Self {
      block_index: BlockIndex::Confirmed(block_index),
      block_timestamp,
      tx_id,
      spent_status: SpentStatus::SpentOnchain,
    }
  }

  /// Construct a context for a key image observed in the unconfirmed chunk.
  pub fn unconfirmed(tx_id: TxId) -> Self {
    Self {
      block_index: BlockIndex::Unconfirmed,
      block_timestamp: 0,
      tx_id,
      spent_status: SpentStatus::SpentUnconfirmed,
    }
  }

  /// `try_update_spent_context` (`spec.md` §4.3.1): spent contexts never downgrade except
  /// through explicit reorg invalidation (`clear`). Returns whether `current` was replaced.
  pub fn try_update(current: &mut Self, candidate: Self) -> bool {
    if candidate.spent_status.rank() > current.spent_status.rank() {
      *current = candidate;
      return true;
    }
    if candidate.spent_status != current.spent_status {
      return false;
    }
    let replace = match (candidate.block_index, current.block_index) {
      (BlockIndex::Confirmed(new), BlockIndex::Confirmed(cur)) => {
        new < cur || (new == cur && candidate.tx_id < current.tx_id)
      }
      _ => false,
    };
    if replace {
      *current = candidate;
    }
    replace
  }

  /// Clear this context back to unspent, as done by reorg invalidation (I8).
  pub fn clear(&mut self) {
    *self = Self::unspent();
  }
}
