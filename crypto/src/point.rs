use std::io::{self, Read, Write};

use subtle::{Choice, ConstantTimeEq, ConditionallySelectable};
use zeroize::Zeroize;

use sha3::{Digest, Keccak256};

use crate::Scalar;

/// A compressed (32-byte) Ed25519 point encoding.
#[derive(Clone, Copy, Eq, Debug, Zeroize)]
pub struct CompressedPoint([u8; 32]);

impl ConstantTimeEq for CompressedPoint {
  fn ct_eq(&self, other: &Self) -> Choice {
    self.0.ct_eq(&other.0)
  }
}
impl PartialEq for CompressedPoint {
  fn eq(&self, other: &Self) -> bool {
    bool::from(self.ct_eq(other))
  }
}

impl CompressedPoint {
  /// The encoding of the identity point.
  pub const IDENTITY: Self = Self([
    1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
  ]);

  /// The `G` base point for the group.
  pub const G: Self = Self(curve25519_dalek::constants::ED25519_BASEPOINT_COMPRESSED.to_bytes());

  /// The `H` generator used for Pedersen commitments to amounts.
  #[rustfmt::skip]
  pub const H: Self = Self([
    139, 101,  89, 112,  21,  55, 153, 175,  42, 234, 220, 159, 241, 173, 208, 234,
    108, 114,  81, 213,  65,  84, 207, 169,  44,  23,  58,  13, 211, 156,  31, 148,
  ]);

  /// Read a compressed point, without checking it decompresses.
  pub fn read<R: Read>(r: &mut R) -> io::Result<Self> {
    let mut bytes = [0; 32];
    r.read_exact(&mut bytes)?;
    Ok(Self(bytes))
  }

  /// Write this compressed point.
  pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
    w.write_all(&self.0)
  }

  /// The raw bytes of this encoding. Not guaranteed to decompress.
  pub fn to_bytes(self) -> [u8; 32] {
    self.0
  }

  /// Canonically decompress this point, rejecting non-canonical (unreduced or `-0`) encodings.
  ///
  /// This does not check the decompressed point lies in the prime-order subgroup; call
  /// [`Point::key_image`] or [`is_torsion_free`] when that matters.
  pub fn decompress(&self) -> Option<Point> {
    curve25519_dalek::edwards::CompressedEdwardsY(self.0)
      .decompress()
      .filter(|point| point.compress().to_bytes() == self.0)
      .map(Point)
  }
}

impl From<[u8; 32]> for CompressedPoint {
  fn from(value: [u8; 32]) -> Self {
    Self(value)
  }
}

/// A decompressed point on the Ed25519 curve.
#[derive(Clone, Copy, Eq, Debug, Zeroize)]
pub struct Point(pub(crate) curve25519_dalek::EdwardsPoint);

impl ConstantTimeEq for Point {
  fn ct_eq(&self, other: &Self) -> Choice {
    self.0.ct_eq(&other.0)
  }
}
impl ConditionallySelectable for Point {
  fn conditional_select(a: &Self, b: &Self, choice: Choice) -> Self {
    Self(<_>::conditional_select(&a.0, &b.0, choice))
  }
}
impl PartialEq for Point {
  fn eq(&self, other: &Self) -> bool {
    bool::from(self.ct_eq(other))
  }
}

// Ordered/hashable so a `Point` can key a `HashMap`/`BTreeMap` (e.g. the subaddress lookup map).
impl PartialOrd for Point {
  fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
    Some(self.cmp(other))
  }
}
impl Ord for Point {
  fn cmp(&self, other: &Self) -> core::cmp::Ordering {
    self.compress().to_bytes().cmp(&other.compress().to_bytes())
  }
}
impl core::hash::Hash for Point {
  fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
    self.compress().to_bytes().hash(state);
  }
}

impl Point {
  /// The group generator `G`.
  pub fn generator() -> Self {
    Self(curve25519_dalek::constants::ED25519_BASEPOINT_POINT)
  }

  /// The identity element.
  pub fn identity() -> Self {
    Self(curve25519_dalek::EdwardsPoint::default())
  }

  /// Decompress this point from its 32-byte compressed form.
  pub fn from_compressed(compressed: CompressedPoint) -> Option<Self> {
    compressed.decompress()
  }

  /// Compress this point.
  pub fn compress(self) -> CompressedPoint {
    CompressedPoint(self.0.compress().to_bytes())
  }

  /// `self * scalar`.
  pub fn mul(self, scalar: Scalar) -> Self {
    Self(self.0 * scalar.0)
  }

  /// `G * scalar`.
  pub fn mul_base(scalar: Scalar) -> Self {
    Self(curve25519_dalek::constants::ED25519_BASEPOINT_POINT * scalar.0)
  }

  /// `self + other`.
  pub fn add(self, other: Self) -> Self {
    Self(self.0 + other.0)
  }

  /// `self - other`.
  pub fn sub(self, other: Self) -> Self {
    Self(self.0 - other.0)
  }

  /// Multiply by the cofactor `8`, clearing any small-order component.
  ///
  /// This is the "torsion clearing" operation named in `spec.md` §6.
  pub fn torsion_clear(self) -> Self {
    Self(self.0.mul_by_cofactor())
  }

  /// Whether this point lies in the prime-order subgroup.
  pub fn is_torsion_free(self) -> bool {
    self.0.is_torsion_free()
  }

  /// Sample a point from a hash digest via a one-way map with unknown discrete log.
  ///
  /// This is the "hash-to-point" primitive that underlies legacy key-image derivation
  /// (`Hp(Ko)`). It implements Elligator 2 over the associated Montgomery curve, mapped onto
  /// Ed25519, the same construction the legacy protocol's `crypto::derive_key_image` relies on.
  #[allow(clippy::many_single_char_names)]
  pub fn hash_to_point(bytes: &[u8]) -> Self {
    use crypto_bigint::{Encoding, modular::constant_mod::*, U256, impl_modulus, const_residue};

    const MODULUS_STR: &str = "7fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffed";
    impl_modulus!(Field25519, U256, MODULUS_STR);
    type Residue = crypto_bigint::modular::constant_mod::Residue<Field25519, { U256::LIMBS }>;

    const A_U256: U256 = U256::from_u64(486_662);
    const A: Residue = const_residue!(A_U256, Field25519);
    const NEGATIVE_A: Residue = A.neg();

    let digest: [u8; 32] = Keccak256::digest(bytes).into();
    let r = Residue::new(&U256::from_le_bytes(digest));

    let r_square = r.square();
    let ur_square = r_square + r_square;
    let one_plus_ur_square = Residue::ONE + ur_square;
    let (one_plus_ur_square_inv, _was_zero) = one_plus_ur_square.invert();
    let upsilon = NEGATIVE_A * one_plus_ur_square_inv;
    let other_candidate = -upsilon - A;

    fn is_quadratic_residue(value: &Residue) -> Choice {
      const SQRT_EXP: U256 = Field25519::MODULUS.shr_vartime(3).wrapping_add(&U256::ONE);
      let z: Residue =
        Residue::ONE.add(&Residue::ONE).pow(&Field25519::MODULUS.shr_vartime(2));
      let y = value.pow(&SQRT_EXP);
      let other = y * z;
      y.square().ct_eq(value) | other.square().ct_eq(value)
    }

    let epsilon = is_quadratic_residue(&(((upsilon + A) * upsilon.square()) + upsilon));
    let u = Residue::conditional_select(&other_candidate, &upsilon, epsilon);

    let res = curve25519_dalek::MontgomeryPoint(u.retrieve().to_le_bytes())
      .to_edwards(epsilon.unwrap_u8())
      .expect("neither Elligator 2 candidate was a square");

    Self(res).torsion_clear()
  }
}

impl core::fmt::Display for CompressedPoint {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    write!(f, "{}", hex::encode(self.0))
  }
}
