use std::io::{self, Read, Write};

use subtle::{Choice, ConstantTimeEq};
use zeroize::Zeroize;

use crate::Point;

/// A key image: a curve point deterministically derived from a one-time spend key and its
/// one-time address, uniquely identifying an enote for double-spend detection.
///
/// Two enotes sharing a one-time address necessarily share a key image (`spec.md` §3.4, I5); this
/// type is `Copy` and orderable so it can key a `BTreeMap`/`HashMap` in the enote store.
#[derive(Clone, Copy, Eq, Zeroize)]
pub struct KeyImage(Point);

impl ConstantTimeEq for KeyImage {
  fn ct_eq(&self, other: &Self) -> Choice {
    self.0.ct_eq(&other.0)
  }
}
impl PartialEq for KeyImage {
  fn eq(&self, other: &Self) -> bool {
    bool::from(self.ct_eq(other))
  }
}

impl core::fmt::Debug for KeyImage {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_tuple("KeyImage").field(&hex::encode(self.0.compress().to_bytes())).finish()
  }
}

// Key images are stored in ordered maps (`tracked_legacy_key_images`, `sp_records`) so reorg
// handling and balance queries have deterministic iteration order.
impl PartialOrd for KeyImage {
  fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
    Some(self.cmp(other))
  }
}
impl Ord for KeyImage {
  fn cmp(&self, other: &Self) -> core::cmp::Ordering {
    self.0.compress().to_bytes().cmp(&other.0.compress().to_bytes())
  }
}
impl core::hash::Hash for KeyImage {
  fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
    self.0.compress().to_bytes().hash(state);
  }
}

impl KeyImage {
  /// Wrap a raw point as a key image, without checking it's torsion-free.
  ///
  /// Callers deriving a key image via [`crate::CryptoAdapter::derive_key_image`] get a
  /// torsion-free point by construction; this constructor exists for deserialization.
  pub fn from_point(point: Point) -> Self {
    Self(point)
  }

  /// The underlying point.
  pub fn point(self) -> Point {
    self.0
  }

  /// Write this key image's compressed encoding.
  pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
    self.0.compress().write(w)
  }

  /// Read a key image from its compressed encoding.
  pub fn read<R: Read>(r: &mut R) -> io::Result<Self> {
    let compressed = crate::CompressedPoint::read(r)?;
    let point =
      compressed.decompress().ok_or_else(|| io::Error::other("key image did not decompress"))?;
    Ok(Self(point))
  }
}
