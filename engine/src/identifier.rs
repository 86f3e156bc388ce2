//! Legacy enote identifiers (`spec.md` §3.4).

use enote_crypto::{CryptoAdapter, Point};

/// `H32(Ko || a)`: two legacy enotes sharing both a one-time address and an amount are
/// interchangeable for key-image purposes, so they share an identifier and the store treats one
/// as able to stand in for the other when a key image arrives (`spec.md` §3.4, §4.3.2).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Identifier([u8; 32]);

impl Identifier {
  /// Compute the identifier of a legacy enote with one-time address `onetime_address` and
  /// cleartext amount `amount`.
  pub fn compute(crypto: &impl CryptoAdapter, onetime_address: Point, amount: u64) -> Self {
    let ko_bytes = onetime_address.compress().to_bytes();
    let digest = crypto.hash_to_32("legacy_identifier", &[&ko_bytes, &amount.to_le_bytes()]);
    Self(digest)
  }

  /// The raw 32-byte identifier, for logging/debugging.
  pub fn as_bytes(&self) -> &[u8; 32] {
    &self.0
  }
}
