use sha3::{Digest, Keccak256};

use crate::{varint, Commitment, KeyImage, Point, Scalar, XPoint};

/// The cryptographic adapter consumed by the scanning engine (`spec.md` §6, "Crypto adapter").
///
/// Every method is a pure function over its arguments: no method observes or mutates anything
/// beyond what's passed in, so implementations are trivially substitutable (e.g. for a hardware
/// wallet that keeps spend-key operations off-host, or for deterministic test fixtures).
pub trait CryptoAdapter {
  /// `scalar * G`.
  fn scalar_mul_base(&self, scalar: Scalar) -> Point;
  /// `scalar * point`.
  fn scalar_mul_point(&self, scalar: Scalar, point: Point) -> Point;
  /// `scalar * point` on the Montgomery curve, for Seraphis ephemeral-key Diffie-Hellman.
  fn montgomery_mul(&self, scalar: Scalar, point: XPoint) -> XPoint;
  /// A domain-separated hash-to-scalar: `Hn(domain || data)`.
  fn hash_to_scalar(&self, domain: &str, data: &[&[u8]]) -> Scalar;
  /// A domain-separated 32-byte hash: `H32(domain || data)`.
  fn hash_to_32(&self, domain: &str, data: &[&[u8]]) -> [u8; 32];
  /// Derive the view tag gating byte for output index `o` given its shared-derivation point `d`.
  fn derive_view_tag(&self, d: Point, o: u64) -> u8;
  /// Derive the key image `KI = spend_priv * Hp(Ko)` for a one-time address `Ko`.
  fn derive_key_image(&self, spend_priv: Scalar, onetime_address: Point) -> KeyImage;
  /// Clear any small-order component from `point` (multiply by the cofactor).
  fn torsion_clear(&self, point: Point) -> Point;
  /// Whether `point` lies in the prime-order subgroup.
  fn is_torsion_free(&self, point: Point) -> bool;
  /// `commit(x, a) = x*G + a*H`.
  fn commit(&self, x: Scalar, a: u64) -> Point;
}

/// The production [`CryptoAdapter`], backed by `curve25519-dalek` and Keccak-256.
#[derive(Clone, Copy, Debug, Default)]
pub struct Ed25519CryptoAdapter;

impl CryptoAdapter for Ed25519CryptoAdapter {
  fn scalar_mul_base(&self, scalar: Scalar) -> Point {
    Point::mul_base(scalar)
  }

  fn scalar_mul_point(&self, scalar: Scalar, point: Point) -> Point {
    point.mul(scalar)
  }

  fn montgomery_mul(&self, scalar: Scalar, point: XPoint) -> XPoint {
    point.mul(scalar)
  }

  fn hash_to_scalar(&self, domain: &str, data: &[&[u8]]) -> Scalar {
    // Keccak-256 only yields 32 bytes; widen to 64 with a second, counter-extended call so the
    // result is reduced from a uniform wide value rather than merely `< 2^256`.
    let first = self.hash_to_32(domain, data);
    let second = self.hash_to_32(domain, &[&first[..], &[1]]);
    let mut wide = [0; 64];
    wide[.. 32].copy_from_slice(&first);
    wide[32 ..].copy_from_slice(&second);
    Scalar::reduce_wide(wide)
  }

  fn hash_to_32(&self, domain: &str, data: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(domain.as_bytes());
    for part in data {
      hasher.update(part);
    }
    hasher.finalize().into()
  }

  fn derive_view_tag(&self, d: Point, o: u64) -> u8 {
    let mut preimage = d.compress().to_bytes().to_vec();
    varint::append(o, &mut preimage);
    self.hash_to_32("view_tag", &[&preimage])[0]
  }

  fn derive_key_image(&self, spend_priv: Scalar, onetime_address: Point) -> KeyImage {
    let hp = Point::hash_to_point(&onetime_address.compress().to_bytes());
    KeyImage::from_point(hp.mul(spend_priv))
  }

  fn torsion_clear(&self, point: Point) -> Point {
    point.torsion_clear()
  }

  fn is_torsion_free(&self, point: Point) -> bool {
    point.is_torsion_free()
  }

  fn commit(&self, x: Scalar, a: u64) -> Point {
    Commitment::new(x, a).commit()
  }
}
