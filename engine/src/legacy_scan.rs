//! Legacy (CryptoNote/RingCT) view scan (`spec.md` §4.2.1).

use enote_crypto::{CryptoAdapter, Point, Scalar};

use crate::{
  context::{OriginContext, TxId},
  enote::EnoteVariant,
  keys::{LegacyKeys, SubaddressIndex},
  memo::EphemeralPubkeys,
  record::{ContextualLegacyIntermediateRecord, LegacyIntermediateRecord},
};

/// The result of successfully matching one output against `keys`.
struct Match {
  enote_view_extension: Scalar,
  amount: u64,
  amount_blinding_factor: Scalar,
  address_index: Option<SubaddressIndex>,
}

/// `H_n(D_t ∥ t)` (`spec.md` §4.2.1).
fn derivation_scalar(crypto: &impl CryptoAdapter, d: Point, t: u64) -> Scalar {
  let d_bytes = d.compress().to_bytes();
  crypto.hash_to_scalar("legacy_derivation", &[&d_bytes, &t.to_le_bytes()])
}

fn try_match_output(
  crypto: &impl CryptoAdapter,
  keys: &LegacyKeys,
  enote: &EnoteVariant,
  d: Point,
  t: u64,
) -> Option<Match> {
  if let Some(stored) = enote.stored_view_tag() {
    let nominal = crypto.derive_view_tag(d, t);
    if nominal != stored {
      return None;
    }
  }

  let derivation = derivation_scalar(crypto, d, t);
  let extension_point = crypto.scalar_mul_base(derivation);
  let ko_nom = enote.onetime_address().sub(extension_point);

  let (address_index, enote_view_extension) = if ko_nom == keys.spend_pubkey {
    (None, derivation)
  } else if let Some((index, offset)) = keys.subaddress_map.get(&ko_nom) {
    (Some(*index), derivation + *offset)
  } else {
    return None;
  };

  let (amount, amount_blinding_factor) = match enote {
    EnoteVariant::LegacyV1(e) => (e.amount, Scalar::ZERO),
    EnoteVariant::LegacyV4(e) => (e.amount, Scalar::ZERO),
    EnoteVariant::LegacyV2(e) => {
      let step2 = crypto.hash_to_scalar("legacy_derivation", &[&derivation.to_bytes()]);
      let step3 = crypto.hash_to_scalar("legacy_derivation", &[&step2.to_bytes()]);
      let mask = e.enc_mask - step2;
      let amount_scalar = e.enc_amount - step3;
      let amount = u64::from_le_bytes(amount_scalar.to_bytes()[.. 8].try_into().expect("8 bytes"));
      if crypto.commit(mask, amount) != e.commitment {
        return None;
      }
      (amount, mask)
    }
    EnoteVariant::LegacyV3(_) | EnoteVariant::LegacyV5(_) => {
      let (enc_amount, commitment) = match enote {
        EnoteVariant::LegacyV3(e) => (e.enc_amount, e.commitment),
        EnoteVariant::LegacyV5(e) => (e.enc_amount, e.commitment),
        _ => unreachable!(),
      };
      let mask = crypto.hash_to_scalar("commitment_mask", &[&derivation.to_bytes()]);
      let amount_mask = crypto.hash_to_32("amount", &[&derivation.to_bytes()]);
      let mut amount_bytes = [0u8; 8];
      for i in 0 .. 8 {
        amount_bytes[i] = enc_amount[i] ^ amount_mask[i];
      }
      let amount = u64::from_le_bytes(amount_bytes);
      if crypto.commit(mask, amount) != commitment {
        return None;
      }
      (amount, mask)
    }
    EnoteVariant::SeraphisCoinbase(_) | EnoteVariant::SeraphisV1(_) => unreachable!("not a legacy enote"),
  };

  Some(Match { enote_view_extension, amount, amount_blinding_factor, address_index })
}

/// View-scan a single legacy transaction's outputs against `keys`, producing one intermediate
/// record per owned enote (`spec.md` §4.2.1). Duplicate onetime addresses within the tx are all
/// emitted; identifier collisions are resolved downstream (§4.3.2).
pub fn scan_transaction(
  crypto: &impl CryptoAdapter,
  keys: &LegacyKeys,
  tx_id: TxId,
  origin_for: impl Fn(u64) -> OriginContext,
  memo_blob: &[u8],
  outputs: &[EnoteVariant],
  unlock_times: &[u64],
) -> Vec<ContextualLegacyIntermediateRecord> {
  let mut out = Vec::new();

  let pubkeys = match EphemeralPubkeys::parse(memo_blob) {
    Some(pubkeys) => pubkeys,
    None => {
      log::debug!("tx {} has an unparseable memo blob, skipping legacy view scan", hex::encode(tx_id));
      return out;
    }
  };

  for (t, enote) in outputs.iter().enumerate() {
    if !enote.is_legacy() {
      continue;
    }
    let r_t = pubkeys.for_output(t, outputs.len());
    let d = crypto.scalar_mul_point(keys.view_privkey, r_t);

    let Some(found) = try_match_output(crypto, keys, enote, d, t as u64) else { continue };

    out.push(ContextualLegacyIntermediateRecord {
      record: LegacyIntermediateRecord {
        enote: enote.clone(),
        ephemeral_pubkey: r_t,
        enote_view_extension: found.enote_view_extension,
        amount: found.amount,
        amount_blinding_factor: found.amount_blinding_factor,
        address_index: found.address_index,
        tx_output_index: t as u64,
        unlock_time: unlock_times.get(t).copied().unwrap_or(0),
      },
      origin: origin_for(t as u64),
    });
  }

  out
}
