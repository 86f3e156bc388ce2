//! Curve, scalar, and key-image primitives backing the enote scanning engine.
//!
//! This crate is deliberately thin: it gives `enote-scan-engine` a concrete, runnable
//! [`CryptoAdapter`] implementation over Ed25519/Curve25519, but it does not implement proofs,
//! signatures, or transaction construction — those stay out of scope per the engine's own
//! specification.

mod adapter;
mod commitment;
mod key_image;
mod point;
mod scalar;
mod varint;
mod xpoint;

pub use adapter::{CryptoAdapter, Ed25519CryptoAdapter};
pub use commitment::Commitment;
pub use key_image::KeyImage;
pub use point::{CompressedPoint, Point};
pub use scalar::Scalar;
pub use xpoint::XPoint;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn commitment_round_trips_through_curve_points() {
    let opening = Commitment::new(Scalar::from(7u64), 42);
    let committed = opening.commit();
    let expected = Point::mul_base(Scalar::from(7u64))
      .add(CompressedPoint::H.decompress().unwrap().mul(Scalar::from(42u64)));
    assert_eq!(committed, expected);
  }

  #[test]
  fn unblinded_commitment_has_zero_mask() {
    let opening = Commitment::unblinded(5);
    assert_eq!(opening.mask, Scalar::ZERO);
    assert_eq!(opening.amount, 5);
  }

  #[test]
  fn adapter_hash_to_scalar_is_deterministic() {
    let adapter = Ed25519CryptoAdapter;
    let a = adapter.hash_to_scalar("view_tag", &[b"hello".as_slice()]);
    let b = adapter.hash_to_scalar("view_tag", &[b"hello".as_slice()]);
    assert_eq!(a, b);
    let c = adapter.hash_to_scalar("other", &[b"hello".as_slice()]);
    assert_ne!(a, c);
  }

  #[test]
  fn derive_key_image_is_deterministic_and_nonidentity() {
    let adapter = Ed25519CryptoAdapter;
    let onetime_address = Point::mul_base(Scalar::from(99u64));
    let ki_a = adapter.derive_key_image(Scalar::from(3u64), onetime_address);
    let ki_b = adapter.derive_key_image(Scalar::from(3u64), onetime_address);
    assert_eq!(ki_a, ki_b);
    assert_ne!(ki_a.point(), Point::identity());
  }

  #[test]
  fn torsion_clearing_is_idempotent() {
    let adapter = Ed25519CryptoAdapter;
    let point = Point::mul_base(Scalar::from(11u64));
    let cleared = adapter.torsion_clear(point);
    assert_eq!(adapter.torsion_clear(cleared), cleared);
    assert!(adapter.is_torsion_free(cleared));
  }
}
