//! The closed union of enote variants (`spec.md` §3.2).
//!
//! This is a tagged union, not a trait object: every variant's accessors are plain pattern
//! matches, following the "tagged unions over inheritance" design note (`spec.md` §9).

use enote_crypto::{Commitment, Point, Scalar};

/// A legacy (CryptoNote/RingCT) one-time address plus cleartext amount: the coinbase form.
#[derive(Clone, Debug)]
pub struct LegacyV1 {
  /// The one-time output key.
  pub onetime_address: Point,
  /// The cleartext amount.
  pub amount: u64,
}

/// A legacy enote with a 32-byte encoded mask and amount (the original RingCT encoding).
#[derive(Clone, Debug)]
pub struct LegacyV2 {
  /// The one-time output key.
  pub onetime_address: Point,
  /// The Pedersen commitment to the (encrypted) amount.
  pub commitment: Point,
  /// The encrypted blinding factor.
  pub enc_mask: Scalar,
  /// The encrypted amount, itself encoded as a scalar.
  pub enc_amount: Scalar,
}

/// A legacy enote with a deterministic mask and an 8-byte encoded amount.
#[derive(Clone, Debug)]
pub struct LegacyV3 {
  /// The one-time output key.
  pub onetime_address: Point,
  /// The Pedersen commitment to the (encrypted) amount.
  pub commitment: Point,
  /// The XOR-encrypted 8-byte amount.
  pub enc_amount: [u8; 8],
}

/// A legacy coinbase enote carrying a view tag.
#[derive(Clone, Debug)]
pub struct LegacyV4 {
  /// The one-time output key.
  pub onetime_address: Point,
  /// The cleartext amount.
  pub amount: u64,
  /// The view-tag gating byte.
  pub view_tag: u8,
}

/// `LegacyV3` plus a view tag.
#[derive(Clone, Debug)]
pub struct LegacyV5 {
  /// The one-time output key.
  pub onetime_address: Point,
  /// The Pedersen commitment to the (encrypted) amount.
  pub commitment: Point,
  /// The XOR-encrypted 8-byte amount.
  pub enc_amount: [u8; 8],
  /// The view-tag gating byte.
  pub view_tag: u8,
}

/// A Seraphis coinbase enote: one-time address plus cleartext amount.
#[derive(Clone, Debug)]
pub struct SeraphisCoinbase {
  /// The one-time output key.
  pub onetime_address: Point,
  /// The cleartext amount.
  pub amount: u64,
  /// The ciphered address tag the sender computed for the intended recipient (`spec.md` §4.2.2):
  /// a real on-chain field, not something the scanner re-derives.
  pub addr_tag: [u8; 16],
}

/// A Seraphis enote with an encrypted amount and view tag.
#[derive(Clone, Debug)]
pub struct SeraphisV1 {
  /// The one-time output key.
  pub onetime_address: Point,
  /// The Pedersen commitment to the (encrypted) amount.
  pub commitment: Point,
  /// The XOR-encrypted 8-byte amount.
  pub enc_amount: [u8; 8],
  /// The view-tag gating byte.
  pub view_tag: u8,
  /// The ciphered address tag the sender computed for the intended recipient.
  pub addr_tag: [u8; 16],
}

/// A single transaction output, in whichever of the two protocols' on-the-wire forms it was
/// published in (`spec.md` §3.2).
#[derive(Clone, Debug)]
pub enum EnoteVariant {
  /// See [`LegacyV1`].
  LegacyV1(LegacyV1),
  /// See [`LegacyV2`].
  LegacyV2(LegacyV2),
  /// See [`LegacyV3`].
  LegacyV3(LegacyV3),
  /// See [`LegacyV4`].
  LegacyV4(LegacyV4),
  /// See [`LegacyV5`].
  LegacyV5(LegacyV5),
  /// See [`SeraphisCoinbase`].
  SeraphisCoinbase(SeraphisCoinbase),
  /// See [`SeraphisV1`].
  SeraphisV1(SeraphisV1),
}

impl EnoteVariant {
  /// Whether this variant belongs to the legacy protocol.
  pub fn is_legacy(&self) -> bool {
    matches!(self, Self::LegacyV1(_) | Self::LegacyV2(_) | Self::LegacyV3(_) | Self::LegacyV4(_) | Self::LegacyV5(_))
  }

  /// Whether this variant carries a view tag, and is thus eligible for the cheap view-tag gate.
  pub fn has_view_tag(&self) -> bool {
    matches!(self, Self::LegacyV4(_) | Self::LegacyV5(_) | Self::SeraphisV1(_))
  }

  /// The stored view tag, if this variant carries one.
  pub fn stored_view_tag(&self) -> Option<u8> {
    match self {
      Self::LegacyV4(e) => Some(e.view_tag),
      Self::LegacyV5(e) => Some(e.view_tag),
      Self::SeraphisV1(e) => Some(e.view_tag),
      _ => None,
    }
  }

  /// The sender-computed ciphered address tag, for Seraphis variants.
  pub fn stored_address_tag(&self) -> Option<[u8; 16]> {
    match self {
      Self::SeraphisCoinbase(e) => Some(e.addr_tag),
      Self::SeraphisV1(e) => Some(e.addr_tag),
      _ => None,
    }
  }

  /// `onetime_address(v)` (`spec.md` §3.2).
  pub fn onetime_address(&self) -> Point {
    match self {
      Self::LegacyV1(e) => e.onetime_address,
      Self::LegacyV2(e) => e.onetime_address,
      Self::LegacyV3(e) => e.onetime_address,
      Self::LegacyV4(e) => e.onetime_address,
      Self::LegacyV5(e) => e.onetime_address,
      Self::SeraphisCoinbase(e) => e.onetime_address,
      Self::SeraphisV1(e) => e.onetime_address,
    }
  }

  /// The cleartext amount, for coinbase-style variants only.
  pub fn cleartext_amount(&self) -> Option<u64> {
    match self {
      Self::LegacyV1(e) => Some(e.amount),
      Self::LegacyV4(e) => Some(e.amount),
      Self::SeraphisCoinbase(e) => Some(e.amount),
      _ => None,
    }
  }

  /// `amount_commitment(v)` (`spec.md` §3.2): for coinbase-style variants this is computed as
  /// `0*G + a*H`; for encrypted variants it's the stored commitment.
  pub fn amount_commitment(&self) -> Point {
    match self {
      Self::LegacyV1(e) => Commitment::unblinded(e.amount).commit(),
      Self::LegacyV4(e) => Commitment::unblinded(e.amount).commit(),
      Self::SeraphisCoinbase(e) => Commitment::unblinded(e.amount).commit(),
      Self::LegacyV2(e) => e.commitment,
      Self::LegacyV3(e) => e.commitment,
      Self::LegacyV5(e) => e.commitment,
      Self::SeraphisV1(e) => e.commitment,
    }
  }
}
