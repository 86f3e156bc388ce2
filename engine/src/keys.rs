//! Key bundles the legacy and Seraphis scans are driven by.
//!
//! These model the wallet's own secrets; deriving them from a seed/mnemonic is explicitly out of
//! scope (`spec.md` §1 "Transaction construction... is out of scope" and the engine only ever
//! *consumes* keys, never generates them).

use std::collections::HashMap;

use enote_crypto::{Point, Scalar};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A legacy (sub)address index: `(account, index)`, with `(0, 0)` denoting the base address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct SubaddressIndex {
  /// The account major index.
  pub account: u32,
  /// The address minor index.
  pub index: u32,
}

impl SubaddressIndex {
  /// The base address is conventionally `(0, 0)`, but isn't itself a "subaddress"; callers use
  /// `Option<SubaddressIndex>` to distinguish base-address ownership (`None`) from a genuine
  /// subaddress match.
  pub fn new(account: u32, index: u32) -> Self {
    Self { account, index }
  }
}

/// The keys needed to view-scan and (once a key image is imported) fully own legacy enotes.
///
/// The `subaddress_map` maps each subaddress's spend public key to its index and the scalar
/// offset (`Hn(k^v, i)`) separating it from the base spend key, so a match is `O(1)` and the
/// offset doesn't need re-derivation (`spec.md` §4.2.1 "found in the subaddress lookup map").
pub struct LegacyKeys {
  /// The base (account) spend public key `K_s`.
  pub spend_pubkey: Point,
  /// The view private key `k_v`.
  pub view_privkey: Scalar,
  /// The spend private key `k_s`, if this wallet instance has spend authority.
  pub spend_privkey: Option<Scalar>,
  /// Subaddress spend public keys this wallet tracks, each mapped to its index and offset.
  pub subaddress_map: HashMap<Point, (SubaddressIndex, Scalar)>,
}

impl Zeroize for LegacyKeys {
  fn zeroize(&mut self) {
    self.spend_pubkey.zeroize();
    self.view_privkey.zeroize();
    self.spend_privkey.zeroize();

    // This may not be effective, unfortunately
    for (mut key, (_, mut offset)) in self.subaddress_map.drain() {
      key.zeroize();
      offset.zeroize();
    }
  }
}
impl Drop for LegacyKeys {
  fn drop(&mut self) {
    self.zeroize();
  }
}
impl ZeroizeOnDrop for LegacyKeys {}

impl LegacyKeys {
  /// A view-only key bundle (no `spend_privkey`): can find and decode enotes, but not compute
  /// key images.
  pub fn view_only(spend_pubkey: Point, view_privkey: Scalar) -> Self {
    Self { spend_pubkey, view_privkey, spend_privkey: None, subaddress_map: HashMap::new() }
  }

  /// A full key bundle with spend authority.
  pub fn full(spend_pubkey: Point, view_privkey: Scalar, spend_privkey: Scalar) -> Self {
    Self {
      spend_pubkey,
      view_privkey,
      spend_privkey: Some(spend_privkey),
      subaddress_map: HashMap::new(),
    }
  }

  /// Register a subaddress so the legacy scan recognizes outputs sent to it.
  pub fn add_subaddress(&mut self, index: SubaddressIndex, spend_pubkey: Point, offset: Scalar) {
    self.subaddress_map.insert(spend_pubkey, (index, offset));
  }
}

/// The keys needed to scan and (once a view-balance key is available) fully own Seraphis
/// enotes.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SeraphisKeys {
  /// The jamtis spend public key `K_1`.
  pub spend_pubkey: Point,
  /// The find-received private key `xk_fr` (Montgomery-curve scalar).
  pub find_received_privkey: Scalar,
  /// The unlock-amounts private key `xk_ua`, needed for the plain (non-selfsend) intermediate
  /// pass.
  pub unlock_amounts_privkey: Option<Scalar>,
  /// The address-generation secret `s_ga`, needed to enumerate/derive owned address indices.
  pub generate_address_secret: Option<Scalar>,
  /// The view-balance private key `k_vb`, needed for full (including self-send) scanning.
  pub view_balance_privkey: Option<Scalar>,
}

impl SeraphisKeys {
  /// Whether this bundle can run the full scan (self-send detection, key images).
  pub fn is_full(&self) -> bool {
    self.view_balance_privkey.is_some()
  }
}
