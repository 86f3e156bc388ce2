use std::io::{self, Read, Write};

use subtle::{Choice, ConstantTimeEq};
use zeroize::Zeroize;

use crate::Scalar;

/// A point on the Montgomery-form auxiliary curve used for Seraphis ephemeral-key
/// Diffie-Hellman (the `x25519`-style channel Jamtis addressing relies on).
#[derive(Clone, Copy, Eq, Debug, Zeroize)]
pub struct XPoint(curve25519_dalek::MontgomeryPoint);

impl ConstantTimeEq for XPoint {
  fn ct_eq(&self, other: &Self) -> Choice {
    self.0.as_bytes().ct_eq(other.0.as_bytes())
  }
}
impl PartialEq for XPoint {
  fn eq(&self, other: &Self) -> bool {
    bool::from(self.ct_eq(other))
  }
}

impl XPoint {
  /// The base point of the Montgomery curve.
  pub fn generator() -> Self {
    Self(curve25519_dalek::constants::X25519_BASEPOINT)
  }

  /// Read a 32-byte Montgomery u-coordinate. Every 32-byte string is a valid (if possibly
  /// low-order) encoding, per the `x25519` field convention.
  pub fn read<R: Read>(r: &mut R) -> io::Result<Self> {
    let mut bytes = [0; 32];
    r.read_exact(&mut bytes)?;
    Ok(Self(curve25519_dalek::MontgomeryPoint(bytes)))
  }

  /// Write this point's u-coordinate.
  pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
    w.write_all(self.0.as_bytes())
  }

  /// The raw u-coordinate.
  pub fn to_bytes(self) -> [u8; 32] {
    self.0.to_bytes()
  }

  /// `self * scalar`, the Montgomery-ladder multiplication used for ephemeral-key DH.
  pub fn mul(self, scalar: Scalar) -> Self {
    Self(self.0 * scalar.0)
  }
}

impl From<[u8; 32]> for XPoint {
  fn from(bytes: [u8; 32]) -> Self {
    Self(curve25519_dalek::MontgomeryPoint(bytes))
  }
}
