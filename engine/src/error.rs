//! Error kinds and their propagation policy (`spec.md` §7).

use enote_crypto::KeyImage;

/// Every recoverable and fatal failure the engine can surface.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
  /// A chunk's `prefix_block_id` didn't match the scan machine's contiguity marker.
  #[error("ledger contiguity lost at requested start index {start_index}")]
  LedgerContiguityLost {
    /// The start index the machine requested the chunk from.
    start_index: u64,
  },
  /// The ledger adapter signaled abort mid-scan.
  #[error("ledger adapter aborted the scan")]
  LedgerAborted,
  /// A single enote failed a per-output check (view tag, spend-key match, commitment
  /// reconstruction). The chunk continues; this is only ever logged, never propagated.
  #[error("malformed enote skipped: {reason}")]
  MalformedEnote {
    /// Human-readable reason the enote was rejected.
    reason: &'static str,
  },
  /// A `(Ko, KI)` pair submitted to [`crate::import_cycle::import_legacy_key_images`] had no
  /// matching intermediate record, or the key image didn't match `Ko` under the spend key.
  #[error("invalid key image import for a one-time address")]
  InvalidKeyImageImport,
  /// Too many consecutive full-scan retries (`spec.md` §4.1).
  #[error("exhausted {attempts} full-scan attempts")]
  FullscanAttemptsExhausted {
    /// The number of attempts made before giving up.
    attempts: u32,
  },
  /// Too many consecutive partial-scan attempts; the machine escalates to `NEED_FULLSCAN`
  /// internally, but this variant is retained for observability by callers inspecting history.
  #[error("exhausted {attempts} partial-scan attempts")]
  PartialscanAttemptsExhausted {
    /// The number of attempts made before escalating.
    attempts: u32,
  },
  /// One of invariants I1-I9 was detected violated mid-operation. This should be unreachable;
  /// the store must be considered corrupt if it occurs.
  #[error("internal invariant violated: {invariant}")]
  InternalInvariantViolation {
    /// Which invariant (e.g. `"I5"`) was violated.
    invariant: &'static str,
  },
  /// A key image presented for import collided with a different spend-key-derived image for
  /// the same one-time address, which should never happen for an honestly-derived pair.
  #[error("key image {0:?} did not match its claimed one-time address")]
  KeyImageMismatch(KeyImage),
}

/// Result alias used throughout the engine.
pub type EngineResult<T> = Result<T, EngineError>;
