//! Seraphis find-received scan and per-record resolution (`spec.md` §4.2.2, §4.2.3).
//!
//! The multi-transaction iterate-until-no-new-txs orchestration of the self-send pass lives in
//! [`crate::chunk`], since it needs visibility across every tx in a chunk plus the store's
//! already-known key images; this module only does the per-enote cryptography.

use enote_crypto::{CryptoAdapter, Scalar, XPoint};

use crate::{
  address_tag::AddressTagCipherContext,
  enote::EnoteVariant,
  keys::SeraphisKeys,
  record::{SeraphisBasicRecord, SeraphisEnoteType, SeraphisFullRecord, SeraphisIntermediateRecord},
};

/// `H1("sp_view_tag" ∥ D_t ∥ t)`, the seraphis analogue of the legacy view-tag gate, computed
/// directly rather than through [`CryptoAdapter::derive_view_tag`] since that method's `Point`
/// argument is the Edwards curve legacy uses, not the Montgomery curve seraphis does.
fn nominal_view_tag(crypto: &impl CryptoAdapter, d_t: XPoint, t: u64) -> u8 {
  crypto.hash_to_32("sp_view_tag", &[&d_t.to_bytes(), &t.to_le_bytes()])[0]
}

/// Find-received scan a single transaction's seraphis outputs (`spec.md` §4.2.2). `ephemeral_pubkeys`
/// is the tx's declared `R_t` list; if it's shorter than `outputs.len()`, the last entry is reused
/// for the remaining outputs.
pub fn find_received_scan(
  crypto: &impl CryptoAdapter,
  find_received_privkey: Scalar,
  input_context: [u8; 32],
  ephemeral_pubkeys: &[XPoint],
  outputs: &[EnoteVariant],
) -> Vec<SeraphisBasicRecord> {
  let mut out = Vec::new();
  if ephemeral_pubkeys.is_empty() {
    return out;
  }

  for (t, enote) in outputs.iter().enumerate() {
    if enote.is_legacy() {
      continue;
    }
    let r_t = *ephemeral_pubkeys.get(t).unwrap_or_else(|| ephemeral_pubkeys.last().unwrap());
    let d_t = crypto.montgomery_mul(find_received_privkey, r_t);

    // Coinbase enotes carry no view tag (`spec.md` §3.2): fall through to the full check, the
    // same way the legacy scan treats a viewtag-less variant (`crate::legacy_scan`).
    if let Some(stored) = enote.stored_view_tag() {
      if nominal_view_tag(crypto, d_t, t as u64) != stored {
        continue;
      }
    }

    // The address tag is a real on-chain field the sender computed (`spec.md` §4.2.2): the scan
    // reads it rather than re-deriving it, since nothing short of the sender's own cipher() call
    // could have produced a value this pass's decipher() will later accept.
    let Some(addr_tag) = enote.stored_address_tag() else { continue };

    out.push(SeraphisBasicRecord {
      enote: enote.clone(),
      ephemeral_pubkey: r_t,
      shared_secret: d_t,
      input_context,
      nominal_address_tag: crate::address_tag::AddressTag::from_raw(addr_tag),
    });
  }

  out
}

fn amount_and_mask(
  crypto: &impl CryptoAdapter,
  enote: &EnoteVariant,
  d_t: XPoint,
) -> Option<(u64, Scalar)> {
  match enote {
    EnoteVariant::SeraphisCoinbase(e) => Some((e.amount, Scalar::ZERO)),
    EnoteVariant::SeraphisV1(e) => {
      let mask = crypto.hash_to_scalar("sp_commitment_mask", &[&d_t.to_bytes()]);
      let amount_mask = crypto.hash_to_32("sp_amount", &[&d_t.to_bytes()]);
      let mut amount_bytes = [0u8; 8];
      for i in 0 .. 8 {
        amount_bytes[i] = e.enc_amount[i] ^ amount_mask[i];
      }
      let amount = u64::from_le_bytes(amount_bytes);
      if crypto.commit(mask, amount) != e.commitment {
        return None;
      }
      Some((amount, mask))
    }
    _ => None,
  }
}

/// Attempt the plain-pass resolution of a basic record into an intermediate record (amount known,
/// no key image): `spec.md` §4.2.3 "Plain pass", run with only `unlock_amounts_privkey` available.
pub fn try_resolve_plain_intermediate(
  crypto: &impl CryptoAdapter,
  keys: &SeraphisKeys,
  basic: &SeraphisBasicRecord,
) -> Option<SeraphisIntermediateRecord> {
  let generate_address_secret = keys.generate_address_secret?;
  let ctx = AddressTagCipherContext::for_shared_secret(crypto, generate_address_secret, basic.shared_secret);
  let address_index = ctx.decipher(basic.nominal_address_tag)?;
  let (amount, amount_blinding_factor) = amount_and_mask(crypto, &basic.enote, basic.shared_secret)?;

  Some(SeraphisIntermediateRecord {
    enote: basic.enote.clone(),
    ephemeral_pubkey: basic.ephemeral_pubkey,
    input_context: basic.input_context,
    amount,
    amount_blinding_factor,
    address_index,
  })
}

/// Attempt the plain-pass resolution of a basic record all the way to a full record (amount,
/// view extensions, and key image), run with the view-balance key available.
pub fn try_resolve_plain_full(
  crypto: &impl CryptoAdapter,
  keys: &SeraphisKeys,
  basic: &SeraphisBasicRecord,
) -> Option<SeraphisFullRecord> {
  let view_balance_privkey = keys.view_balance_privkey?;
  let generate_address_secret = keys.generate_address_secret?;
  let ctx = AddressTagCipherContext::for_shared_secret(crypto, generate_address_secret, basic.shared_secret);
  let address_index = ctx.decipher(basic.nominal_address_tag)?;
  resolve_full_common(crypto, view_balance_privkey, basic, address_index, SeraphisEnoteType::Plain)
}

/// Attempt the self-send-pass resolution of a basic record: re-derive the self-send candidate at
/// `address_index` (one the caller already knows it owns) and check it matches, without relying
/// on a cipherable address tag (`spec.md` §4.2.3 "Self-send pass").
pub fn try_resolve_self_send(
  crypto: &impl CryptoAdapter,
  keys: &SeraphisKeys,
  basic: &SeraphisBasicRecord,
  candidate_address_index: u32,
) -> Option<SeraphisFullRecord> {
  let view_balance_privkey = keys.view_balance_privkey?;
  let generate_address_secret = keys.generate_address_secret?;

  let ctx = AddressTagCipherContext::for_shared_secret(crypto, generate_address_secret, basic.shared_secret);
  let expected_tag = ctx.cipher(candidate_address_index);
  let self_send_tag =
    crypto.hash_to_32("sp_self_send_tag", &[expected_tag.as_bytes(), &view_balance_privkey.to_bytes()]);
  let mut expected = [0u8; 16];
  expected.copy_from_slice(&self_send_tag[.. 16]);
  if basic.nominal_address_tag.as_bytes() != &expected {
    return None;
  }

  resolve_full_common(crypto, view_balance_privkey, basic, candidate_address_index, SeraphisEnoteType::SelfSend)
}

fn resolve_full_common(
  crypto: &impl CryptoAdapter,
  view_balance_privkey: Scalar,
  basic: &SeraphisBasicRecord,
  address_index: u32,
  enote_type: SeraphisEnoteType,
) -> Option<SeraphisFullRecord> {
  let (amount, amount_blinding_factor) = amount_and_mask(crypto, &basic.enote, basic.shared_secret)?;

  let d_bytes = basic.shared_secret.to_bytes();
  let view_extension_g =
    crypto.hash_to_scalar("sp_view_extension_g", &[&d_bytes, &address_index.to_le_bytes()]);
  let view_extension_x =
    crypto.hash_to_scalar("sp_view_extension_x", &[&d_bytes, &address_index.to_le_bytes()]);
  let view_extension_u =
    crypto.hash_to_scalar("sp_view_extension_u", &[&d_bytes, &address_index.to_le_bytes()]);

  let spend_component = crypto.scalar_mul_base(view_balance_privkey + view_extension_u);
  let key_image = crypto.derive_key_image(view_extension_g, spend_component);

  Some(SeraphisFullRecord {
    enote: basic.enote.clone(),
    ephemeral_pubkey: basic.ephemeral_pubkey,
    input_context: basic.input_context,
    view_extension_g,
    view_extension_x,
    view_extension_u,
    amount,
    amount_blinding_factor,
    key_image,
    address_index,
    enote_type,
  })
}
