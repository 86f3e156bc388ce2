//! Tunables for the scan machine, chunk processor, and enote store.

/// Every knob named across `spec.md`, bundled so callers configure the engine in one place.
#[derive(Clone, Copy, Debug)]
pub struct ScanConfig {
  /// Requested chunk size hint passed to the ledger adapter (`spec.md` §4.1 step 1).
  pub max_chunk_size_hint: u64,
  /// How far back `start_index` is bumped on a `NEED_PARTIALSCAN` response.
  pub reorg_avoidance_increment: u64,
  /// Attempts at partial-scan recovery before escalating to a full scan.
  pub max_partialscan_attempts: u32,
  /// Consecutive full-scan retries before returning `FullscanAttemptsExhausted`.
  pub max_fullscan_attempts: u32,
  /// Blocks whose spendable age alone (absent a longer `unlock_time`) a record is locked for.
  pub default_spendable_age: u64,
  /// Number of most-recent checkpoints the checkpoint cache never prunes (I4).
  pub num_unprunable: usize,
  /// Multiplicative thinning factor applied to checkpoints older than `num_unprunable` (I4).
  pub density_factor: u64,
  /// Maximum gap ever allowed to develop between two retained checkpoints (I4).
  pub max_separation: u64,
  /// First block at which Seraphis outputs are legal (`spec.md` §4.4).
  pub first_sp_allowed_block: u64,
  /// First block at which legacy outputs are no longer legal (`spec.md` §4.4).
  pub first_sp_only_block: u64,
}

impl Default for ScanConfig {
  fn default() -> Self {
    Self {
      max_chunk_size_hint: 100,
      reorg_avoidance_increment: 10,
      max_partialscan_attempts: 3,
      max_fullscan_attempts: 3,
      default_spendable_age: 10,
      num_unprunable: 20,
      density_factor: 2,
      max_separation: 5_000,
      first_sp_allowed_block: 0,
      first_sp_only_block: u64::MAX,
    }
  }
}
