//! A short cipher-text binding a Seraphis enote to an address index (`spec.md` §4.2.2-4.2.3).
//!
//! The real Jamtis address-tag cipher is out of this engine's scope (it's a cryptographic
//! primitive, `spec.md` §1); this module gives the chunk processor a concrete, self-consistent
//! stand-in with the same external contract: `cipher(key, j)` produces a short tag only the
//! holder of `key` can invert back to `j`, and tampering is detected.

use enote_crypto::{CryptoAdapter, Scalar, XPoint};

/// A short (16-byte) ciphered address tag.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct AddressTag([u8; 16]);

impl AddressTag {
  /// Wrap a tag read straight off an enote.
  pub fn from_raw(bytes: [u8; 16]) -> Self {
    Self(bytes)
  }

  /// The raw bytes, for logging/debugging.
  pub fn as_bytes(&self) -> &[u8; 16] {
    &self.0
  }
}

/// The decipher context: a generate-address secret plus the crypto adapter's domain-separated
/// hash, bundled as `jamtis_address_tag_cipher_context` is in the protocol this was distilled
/// from.
pub struct AddressTagCipherContext<'a, C> {
  crypto: &'a C,
  generate_address_secret: [u8; 32],
}

impl<'a, C: CryptoAdapter> AddressTagCipherContext<'a, C> {
  /// Build a cipher context from a generate-address secret.
  pub fn new(crypto: &'a C, generate_address_secret: [u8; 32]) -> Self {
    Self { crypto, generate_address_secret }
  }

  /// Build a per-enote cipher context by binding the wallet's generate-address secret to this
  /// enote's shared Diffie-Hellman key `D_t`, so distinct enotes (distinct `D_t`) use distinct
  /// keystreams even though `generate_address_secret` itself never changes.
  pub fn for_shared_secret(crypto: &'a C, generate_address_secret: Scalar, d_t: XPoint) -> Self {
    let key_material =
      crypto.hash_to_32("address_tag_key", &[&generate_address_secret.to_bytes(), &d_t.to_bytes()]);
    Self::new(crypto, key_material)
  }

  fn keystream(&self, salt: &str) -> [u8; 16] {
    let wide = self.crypto.hash_to_32(salt, &[&self.generate_address_secret]);
    let mut out = [0; 16];
    out.copy_from_slice(&wide[.. 16]);
    out
  }

  /// Cipher an address index into a tag only this context can decipher.
  pub fn cipher(&self, address_index: u32) -> AddressTag {
    let mut plaintext = [0u8; 16];
    plaintext[.. 4].copy_from_slice(&address_index.to_le_bytes());
    let checksum =
      self.crypto.hash_to_32("address_tag_check", &[&self.generate_address_secret, &plaintext[.. 4]]);
    plaintext[4 .. 8].copy_from_slice(&checksum[.. 4]);

    let keystream = self.keystream("address_tag_cipher");
    let mut ciphertext = [0; 16];
    for i in 0 .. 16 {
      ciphertext[i] = plaintext[i] ^ keystream[i];
    }
    AddressTag(ciphertext)
  }

  /// Attempt to decipher a tag, returning the address index iff the integrity check passes.
  pub fn decipher(&self, tag: AddressTag) -> Option<u32> {
    let keystream = self.keystream("address_tag_cipher");
    let mut plaintext = [0u8; 16];
    for i in 0 .. 16 {
      plaintext[i] = tag.0[i] ^ keystream[i];
    }
    let index = u32::from_le_bytes(plaintext[.. 4].try_into().expect("4 bytes"));
    let expected_checksum =
      self.crypto.hash_to_32("address_tag_check", &[&self.generate_address_secret, &plaintext[.. 4]]);
    if plaintext[4 .. 8] == expected_checksum[.. 4] {
      Some(index)
    } else {
      None
    }
  }
}
