use std::{
  io::{self, Read, Write},
  sync::OnceLock,
};

use subtle::{Choice, ConstantTimeEq};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{CompressedPoint, Point, Scalar};

fn h_point() -> Point {
  static H: OnceLock<Point> = OnceLock::new();
  *H.get_or_init(|| {
    CompressedPoint::H.decompress().expect("couldn't decompress the H generator")
  })
}

/// The opening of a Pedersen commitment to a `u64` amount: `mask * G + amount * H`.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Commitment {
  /// The blinding factor.
  pub mask: Scalar,
  /// The committed amount.
  pub amount: u64,
}

impl ConstantTimeEq for Commitment {
  fn ct_eq(&self, other: &Self) -> Choice {
    self.mask.ct_eq(&other.mask) & self.amount.ct_eq(&other.amount)
  }
}
impl PartialEq for Commitment {
  fn eq(&self, other: &Self) -> bool {
    bool::from(self.ct_eq(other))
  }
}

impl core::fmt::Debug for Commitment {
  /// Reveals the amount but not the mask.
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("Commitment").field("amount", &self.amount).finish_non_exhaustive()
  }
}

impl Commitment {
  /// An unblinded commitment to `0`, with mask `1` so it isn't the identity.
  pub fn zero() -> Self {
    Self { mask: Scalar::ONE, amount: 0 }
  }

  /// Construct an unblinded commitment to `amount`, as used by coinbase/V1/V4 enotes
  /// (`spec.md` §3.2: "the commitment is computed as `0*G + a*H`").
  pub fn unblinded(amount: u64) -> Self {
    Self { mask: Scalar::ZERO, amount }
  }

  /// A new opening for an arbitrary mask and amount.
  pub fn new(mask: Scalar, amount: u64) -> Self {
    Self { mask, amount }
  }

  /// Compute `mask * G + amount * H`, the `commit(x, a)` operation of `spec.md` §6.
  pub fn commit(&self) -> Point {
    Point::mul_base(self.mask).add(h_point().mul(Scalar::from(self.amount)))
  }

  /// Write this opening. Not part of the wire protocol; used for internal hashing/storage only.
  pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
    self.mask.write(w)?;
    w.write_all(&self.amount.to_le_bytes())
  }

  /// Read an opening previously written with [`Commitment::write`].
  pub fn read<R: Read>(r: &mut R) -> io::Result<Self> {
    let mask = Scalar::read(r)?;
    let mut amount = [0; 8];
    r.read_exact(&mut amount)?;
    Ok(Self { mask, amount: u64::from_le_bytes(amount) })
  }
}
