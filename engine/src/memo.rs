//! Extraction of ephemeral pubkeys from a transaction's memo/extra blob (`spec.md` §4.2.1 step 1).
//!
//! The memo blob's layout: one byte giving the additional-pubkey count `n`, followed by the main
//! ephemeral pubkey `R` (32 bytes), followed by `n` additional pubkeys `R_t` (32 bytes each).
//! Anything beyond that is payment-id/arbitrary data this engine does not interpret.

use enote_crypto::Point;

/// The ephemeral pubkeys parsed out of a transaction's memo blob.
#[derive(Clone, Debug)]
pub struct EphemeralPubkeys {
  /// The transaction-wide ephemeral pubkey `R`.
  pub main: Point,
  /// Per-output ephemeral pubkeys `R_t`, present only when the sender varied them per-subaddress.
  pub additional: Vec<Point>,
}

impl EphemeralPubkeys {
  /// Parse a memo blob. Returns `None` if the blob is too short to contain even the main pubkey,
  /// or if a declared additional pubkey doesn't decompress to a valid curve point.
  pub fn parse(memo_blob: &[u8]) -> Option<Self> {
    if memo_blob.is_empty() {
      return None;
    }
    let count = memo_blob[0] as usize;
    let mut offset = 1;
    let main = Self::read_point(memo_blob, &mut offset)?;
    let mut additional = Vec::with_capacity(count);
    for _ in 0 .. count {
      additional.push(Self::read_point(memo_blob, &mut offset)?);
    }
    Some(Self { main, additional })
  }

  fn read_point(blob: &[u8], offset: &mut usize) -> Option<Point> {
    let slice = blob.get(*offset .. *offset + 32)?;
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(slice);
    *offset += 32;
    enote_crypto::CompressedPoint::from(bytes).decompress()
  }

  /// The ephemeral pubkey to use for output index `t` (`spec.md` §4.2.1 step 2): the matching
  /// additional pubkey if the counts line up with the output count, else the shared main pubkey.
  ///
  /// Per `spec.md` §4.2.1 step 1, a declared-but-miscounted additional-pubkey list rejects the
  /// whole tx's additional-pubkey path; callers should check `additional.len()` against the
  /// tx's output count before calling this and fall back to `main` for every output on mismatch.
  pub fn for_output(&self, t: usize, output_count: usize) -> Point {
    if self.additional.len() == output_count {
      self.additional[t]
    } else {
      self.main
    }
  }
}
