use std::io::{self, Read, Write};

use subtle::{Choice, ConstantTimeEq};
use zeroize::Zeroize;

/// A scalar reduced modulo the prime order `l` of the Ed25519 group.
#[derive(Clone, Copy, Eq, Debug, Zeroize)]
pub struct Scalar(pub(crate) curve25519_dalek::Scalar);

impl ConstantTimeEq for Scalar {
  fn ct_eq(&self, other: &Self) -> Choice {
    self.0.ct_eq(&other.0)
  }
}
impl PartialEq for Scalar {
  fn eq(&self, other: &Self) -> bool {
    bool::from(self.ct_eq(other))
  }
}

impl Scalar {
  /// The additive identity.
  pub const ZERO: Self = Self(curve25519_dalek::Scalar::ZERO);
  /// The multiplicative identity.
  pub const ONE: Self = Self(curve25519_dalek::Scalar::ONE);

  /// Reduce a wide (64-byte) hash output into a `Scalar`.
  ///
  /// This is how every domain-separated hash-to-scalar call in this crate terminates.
  pub fn reduce_wide(bytes: [u8; 64]) -> Self {
    Self(curve25519_dalek::Scalar::from_bytes_mod_order_wide(&bytes))
  }

  /// Interpret 32 little-endian bytes as an already-reduced scalar, without checking reduction.
  ///
  /// Used when a value is known by construction to already be canonical (e.g. it was itself
  /// produced by [`Scalar::reduce_wide`]).
  pub fn from_canonical_bytes(bytes: [u8; 32]) -> Option<Self> {
    Option::from(curve25519_dalek::Scalar::from_canonical_bytes(bytes)).map(Self)
  }

  /// Serialize this scalar as 32 little-endian bytes.
  pub fn to_bytes(self) -> [u8; 32] {
    self.0.to_bytes()
  }

  /// Write this scalar to a writer.
  pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
    w.write_all(&self.to_bytes())
  }

  /// Read a canonically-encoded scalar.
  pub fn read<R: Read>(r: &mut R) -> io::Result<Self> {
    let mut bytes = [0; 32];
    r.read_exact(&mut bytes)?;
    Self::from_canonical_bytes(bytes).ok_or_else(|| io::Error::other("non-canonical scalar"))
  }
}

impl From<u64> for Scalar {
  fn from(value: u64) -> Self {
    Self(curve25519_dalek::Scalar::from(value))
  }
}

impl core::ops::Add for Scalar {
  type Output = Self;
  fn add(self, rhs: Self) -> Self {
    Self(self.0 + rhs.0)
  }
}
impl core::ops::Sub for Scalar {
  type Output = Self;
  fn sub(self, rhs: Self) -> Self {
    Self(self.0 - rhs.0)
  }
}
impl core::ops::Mul for Scalar {
  type Output = Self;
  fn mul(self, rhs: Self) -> Self {
    Self(self.0 * rhs.0)
  }
}
impl core::ops::Neg for Scalar {
  type Output = Self;
  fn neg(self) -> Self {
    Self(-self.0)
  }
}
