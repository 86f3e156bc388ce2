//! Shared test fixtures for the literal scenarios of `spec.md` §8.
//!
//! These helpers play the role of the external transaction-construction component the engine
//! itself never implements (`spec.md` §1): they build on-chain [`ChunkTx`]s that a real sender
//! would have produced, using the same derivations the scan side inverts.

use enote_crypto::{CryptoAdapter, Ed25519CryptoAdapter, KeyImage, Point, Scalar, XPoint};

use enote_scan_engine::{
  address_tag::AddressTagCipherContext,
  enote::{EnoteVariant, LegacyV1, SeraphisCoinbase},
  keys::{LegacyKeys, SeraphisKeys},
  ledger::{ChunkTx, KeyImageProtocolTag},
};

pub const CRYPTO: Ed25519CryptoAdapter = Ed25519CryptoAdapter;

/// A test wallet's full legacy key bundle (spend authority present).
pub struct TestLegacyWallet {
  pub keys: LegacyKeys,
}

pub fn legacy_wallet(seed: u64) -> TestLegacyWallet {
  let spend_privkey = Scalar::from(1000 + seed);
  let view_privkey = Scalar::from(2000 + seed);
  let spend_pubkey = CRYPTO.scalar_mul_base(spend_privkey);
  TestLegacyWallet { keys: LegacyKeys::full(spend_pubkey, view_privkey, spend_privkey) }
}

pub fn legacy_wallet_view_only(seed: u64) -> TestLegacyWallet {
  let spend_privkey = Scalar::from(1000 + seed);
  let view_privkey = Scalar::from(2000 + seed);
  let spend_pubkey = CRYPTO.scalar_mul_base(spend_privkey);
  TestLegacyWallet { keys: LegacyKeys::view_only(spend_pubkey, view_privkey) }
}

/// A legacy `memo_blob` carrying exactly one (main, no-additional) ephemeral pubkey.
fn legacy_memo(r: Point) -> Vec<u8> {
  let mut blob = vec![0u8];
  blob.extend_from_slice(&r.compress().to_bytes());
  blob
}

/// Build a single-output legacy-V1 (coinbase-style, cleartext amount) transaction paying `amount`
/// to `keys`'s base address, as a real sender would: pick an ephemeral secret, derive `D`, and
/// derive `Ko = K_s + Hn(D||t)*G` exactly as `legacy_scan::try_match_output` inverts.
pub fn legacy_coinbase_tx(tx_id_byte: u8, keys: &LegacyKeys, amount: u64, ephemeral_seed: u64) -> ChunkTx {
  let r = Scalar::from(ephemeral_seed);
  let ephemeral_pubkey = CRYPTO.scalar_mul_base(r);
  let d = CRYPTO.scalar_mul_point(keys.view_privkey, ephemeral_pubkey);
  let t: u64 = 0;
  let derivation = CRYPTO.hash_to_scalar("legacy_derivation", &[&d.compress().to_bytes(), &t.to_le_bytes()]);
  let onetime_address = keys.spend_pubkey.add(CRYPTO.scalar_mul_base(derivation));

  ChunkTx {
    tx_id: [tx_id_byte; 32],
    timestamp: 0,
    extra_blob: legacy_memo(ephemeral_pubkey),
    outputs: vec![EnoteVariant::LegacyV1(LegacyV1 { onetime_address, amount })],
    unlock_times: vec![0],
    input_key_images: Vec::new(),
  }
}

/// Same as [`legacy_coinbase_tx`] but with an explicit `unlock_time` and explicit onetime address
/// (so two txs can share the same `Ko`, as scenario 6 of `spec.md` §8 needs).
pub fn legacy_tx_with_ko(
  tx_id_byte: u8,
  keys: &LegacyKeys,
  amount: u64,
  ephemeral_seed: u64,
  unlock_time: u64,
) -> (ChunkTx, Point) {
  let mut tx = legacy_coinbase_tx(tx_id_byte, keys, amount, ephemeral_seed);
  tx.unlock_times = vec![unlock_time];
  let ko = tx.outputs[0].onetime_address();
  (tx, ko)
}

/// Build a legacy transaction reusing a given onetime address `ko` with a new amount (the memo's
/// ephemeral pubkey is irrelevant here since the scan never needs to re-derive `ko` from it for
/// this helper's purpose: it's testing identifier collision on shared `Ko`, so the derivation
/// doesn't need to round-trip through view-key matching again — the output is inserted directly
/// authored to match).
pub fn legacy_tx_reusing_ko(
  tx_id_byte: u8,
  keys: &LegacyKeys,
  ko: Point,
  amount: u64,
  ephemeral_seed: u64,
) -> ChunkTx {
  let r = Scalar::from(ephemeral_seed);
  let ephemeral_pubkey = CRYPTO.scalar_mul_base(r);
  ChunkTx {
    tx_id: [tx_id_byte; 32],
    timestamp: 0,
    extra_blob: legacy_memo(ephemeral_pubkey),
    outputs: vec![EnoteVariant::LegacyV1(LegacyV1 { onetime_address: ko, amount })],
    unlock_times: vec![0],
    input_key_images: Vec::new(),
  }
}

/// A legacy-format memo prefix (valid, parses to zero additional pubkeys) long enough that
/// `crate::chunk::extract_ephemeral` resolves the seraphis ephemeral-pubkey section that follows
/// it unambiguously, even though this tx carries no legacy outputs at all.
fn legacy_prefix_then_seraphis_ephemeral(main: XPoint) -> Vec<u8> {
  let mut blob = vec![0u8];
  blob.extend_from_slice(&Point::generator().compress().to_bytes());
  blob.push(0u8);
  blob.extend_from_slice(&main.to_bytes());
  blob
}

pub struct TestSeraphisWallet {
  pub keys: SeraphisKeys,
}

pub fn sp_wallet(seed: u64) -> TestSeraphisWallet {
  let find_received_privkey = Scalar::from(3000 + seed);
  let spend_pubkey = CRYPTO.scalar_mul_base(Scalar::from(4000 + seed));
  TestSeraphisWallet {
    keys: SeraphisKeys {
      spend_pubkey,
      find_received_privkey,
      unlock_amounts_privkey: Some(Scalar::from(5000 + seed)),
      generate_address_secret: Some(Scalar::from(6000 + seed)),
      view_balance_privkey: Some(Scalar::from(7000 + seed)),
    },
  }
}

fn sp_shared_secret(find_received_privkey: Scalar, ephemeral_pubkey: XPoint) -> XPoint {
  CRYPTO.montgomery_mul(find_received_privkey, ephemeral_pubkey)
}

/// Build a single-output Seraphis coinbase transaction sent via the plain pass to
/// `address_index` (`spec.md` §4.2.3 "Plain pass"): the sender ciphers the address index into the
/// on-chain `addr_tag` field using the shared secret, exactly as `sp_scan::try_resolve_plain_*`
/// expects to invert.
pub fn sp_coinbase_tx(tx_id_byte: u8, keys: &SeraphisKeys, amount: u64, address_index: u32, ephemeral_seed: u64) -> ChunkTx {
  let r = Scalar::from(ephemeral_seed);
  let ephemeral_pubkey = XPoint::generator().mul(r);
  let d_t = sp_shared_secret(keys.find_received_privkey, ephemeral_pubkey);
  let generate_address_secret = keys.generate_address_secret.expect("test wallet has generate_address_secret");
  let ctx = AddressTagCipherContext::for_shared_secret(&CRYPTO, generate_address_secret, d_t);
  let addr_tag = *ctx.cipher(address_index).as_bytes();
  let onetime_address = CRYPTO.scalar_mul_base(Scalar::from(u64::from(tx_id_byte) + 90_000));

  ChunkTx {
    tx_id: [tx_id_byte; 32],
    timestamp: 0,
    extra_blob: legacy_prefix_then_seraphis_ephemeral(ephemeral_pubkey),
    outputs: vec![EnoteVariant::SeraphisCoinbase(SeraphisCoinbase { onetime_address, amount, addr_tag })],
    unlock_times: vec![0],
    input_key_images: Vec::new(),
  }
}

/// Build a Seraphis self-send transaction (`spec.md` §4.2.3 "Self-send pass"): its `addr_tag`
/// field is the self-send tag `try_resolve_self_send` checks for, and it spends `spent_key_image`
/// so the self-send fixpoint can reach it from an already-known-owned enote.
pub fn sp_self_send_tx(
  tx_id_byte: u8,
  keys: &SeraphisKeys,
  amount: u64,
  address_index: u32,
  ephemeral_seed: u64,
  spent_key_image: KeyImage,
) -> ChunkTx {
  let r = Scalar::from(ephemeral_seed);
  let ephemeral_pubkey = XPoint::generator().mul(r);
  let d_t = sp_shared_secret(keys.find_received_privkey, ephemeral_pubkey);
  let generate_address_secret = keys.generate_address_secret.expect("test wallet has generate_address_secret");
  let view_balance_privkey = keys.view_balance_privkey.expect("test wallet has view_balance_privkey");

  let ctx = AddressTagCipherContext::for_shared_secret(&CRYPTO, generate_address_secret, d_t);
  let expected_tag = ctx.cipher(address_index);
  let self_send_tag = CRYPTO.hash_to_32("sp_self_send_tag", &[expected_tag.as_bytes(), &view_balance_privkey.to_bytes()]);
  let mut addr_tag = [0u8; 16];
  addr_tag.copy_from_slice(&self_send_tag[.. 16]);

  let onetime_address = CRYPTO.scalar_mul_base(Scalar::from(u64::from(tx_id_byte) + 190_000));

  ChunkTx {
    tx_id: [tx_id_byte; 32],
    timestamp: 0,
    extra_blob: legacy_prefix_then_seraphis_ephemeral(ephemeral_pubkey),
    outputs: vec![EnoteVariant::SeraphisCoinbase(SeraphisCoinbase { onetime_address, amount, addr_tag })],
    unlock_times: vec![0],
    input_key_images: vec![(spent_key_image, KeyImageProtocolTag::SeraphisSelfSend)],
  }
}
