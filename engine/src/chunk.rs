//! The chunk processor (`spec.md` §4.2): extracts owned enotes and spending key images from a
//! chunk's transactions, independent of the order transactions appear in within the chunk.

use std::collections::HashSet;

use enote_crypto::{CryptoAdapter, KeyImage};

use crate::{
  config::ScanConfig,
  context::{OriginContext, SpentContext, TxId},
  keys::{LegacyKeys, SeraphisKeys},
  ledger::{ChunkTx, KeyImageProtocolTag},
  legacy_scan,
  record::{
    ContextualLegacyIntermediateRecord, ContextualLegacyRecord, ContextualSeraphisIntermediateRecord,
    ContextualSeraphisRecord, SeraphisBasicRecord,
  },
  sp_scan,
};

/// Which of the two protocols a cached key image set was attributed to (`spec.md` §4.2.4).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum KeyImageOrigin {
  /// A legacy transaction's own inputs.
  Legacy,
  /// A seraphis transaction's inputs, where the tx was not (as far as this scan could tell) a
  /// self-send.
  SeraphisNonSelfSend,
  /// A seraphis self-send transaction's inputs — legacy key images cached here are later matched
  /// to legacy enotes as those enotes' own key images become known (`spec.md` §4.2.4).
  SeraphisSelfSend,
}

/// One key-image sighting, tagged with the transaction it came from and that tx's attribution.
#[derive(Clone, Debug)]
pub struct KeyImageSighting {
  /// The key image itself.
  pub key_image: KeyImage,
  /// Where (and as what status) it was seen.
  pub spent: SpentContext,
  /// Which protocol/self-send bucket it's attributed to.
  pub origin: KeyImageOrigin,
}

/// Everything the chunk processor recovered from one chunk (`spec.md` §4.2's `ChunkResult`).
#[derive(Default, Debug)]
pub struct ChunkResult {
  /// Newly found legacy intermediate (no key image yet) records.
  pub legacy_intermediate: Vec<ContextualLegacyIntermediateRecord>,
  /// Newly found legacy full records (key image computable because spend authority was present).
  pub legacy_full: Vec<ContextualLegacyRecord>,
  /// Newly found seraphis intermediate records.
  pub sp_intermediate: Vec<ContextualSeraphisIntermediateRecord>,
  /// Newly found seraphis full records.
  pub sp_full: Vec<ContextualSeraphisRecord>,
  /// Every key image observed spending an input in this chunk, across both protocols.
  pub key_images: Vec<KeyImageSighting>,
  /// Legacy key images cached from seraphis self-send tx inputs, for later correlation
  /// (`spec.md` §4.2.4) — a subset of `key_images` filtered to `SeraphisSelfSend`-tagged legacy
  /// key images, kept separately since that's how the store consumes them.
  pub cached_legacy_key_images_from_selfsend: Vec<(KeyImage, SpentContext)>,
}

struct TxWork<'a> {
  tx: &'a ChunkTx,
  origin_for: Box<dyn Fn(u64) -> OriginContext + 'a>,
  spent: SpentContext,
  basic: Vec<SeraphisBasicRecord>,
  resolved: Vec<bool>,
  known_ours: bool,
  self_send_confirmed: bool,
}

/// Whether the legacy side of a scan decodes new enotes or only collects key images
/// (`spec.md` §4.3.4 step 4, the import cycle's key-image-only re-scan).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum LegacyScanMode {
  /// Decode new legacy enotes as usual.
  #[default]
  Full,
  /// Skip output decoding entirely; only key images are collected.
  KeyImagesOnly,
}

/// Everything the chunk processor needs beyond the chunk itself: the keys to scan with, and the
/// store's current knowledge the self-send pass iterates against.
pub struct ChunkScanContext<'a> {
  /// Legacy keys, if this wallet instance tracks the legacy protocol at all.
  pub legacy_keys: Option<&'a LegacyKeys>,
  /// Seraphis keys, if this wallet instance tracks seraphis.
  pub sp_keys: Option<&'a SeraphisKeys>,
  /// Address indices already known to belong to this wallet (from prior scans), seeding the
  /// self-send pass's candidate set.
  pub known_address_indices: &'a [u32],
  /// Key images already known to belong to this wallet's own enotes (from prior scans), seeding
  /// which txs are "known ours" at the start of the self-send pass.
  pub owned_key_images: &'a HashSet<KeyImage>,
  /// The protocol transition watermarks (`spec.md` §4.4).
  pub config: &'a ScanConfig,
  /// Whether legacy output decoding should run at all this pass.
  pub legacy_scan_mode: LegacyScanMode,
}

fn legacy_eligible(config: &ScanConfig, block_index: Option<u64>) -> bool {
  match block_index {
    Some(index) => index < config.first_sp_only_block,
    None => true,
  }
}

fn sp_eligible(config: &ScanConfig, block_index: Option<u64>) -> bool {
  match block_index {
    Some(index) => index >= config.first_sp_allowed_block,
    None => true,
  }
}

/// Process one block's (or the non-ledger chunk's) worth of transactions.
pub fn process_transactions(
  crypto: &impl CryptoAdapter,
  ctx: &ChunkScanContext<'_>,
  txs: &[ChunkTx],
  block_index: Option<u64>,
  block_timestamp: u64,
) -> ChunkResult {
  let mut result = ChunkResult::default();
  let legacy_ok =
    legacy_eligible(ctx.config, block_index) && ctx.legacy_scan_mode == LegacyScanMode::Full;
  let sp_ok = sp_eligible(ctx.config, block_index);

  let mut known_ours: HashSet<TxId> = HashSet::new();
  let mut known_address_indices: HashSet<u32> = ctx.known_address_indices.iter().copied().collect();
  let mut work: Vec<TxWork<'_>> = Vec::with_capacity(txs.len());

  for tx in txs {
    let outputs = &tx.outputs;

    if legacy_ok {
      if let Some(legacy_keys) = ctx.legacy_keys {
        let origin_for = |t: u64| match block_index {
          Some(index) => OriginContext::onchain(index, block_timestamp, tx.tx_id, t, tx.extra_blob.clone()),
          None => OriginContext::unconfirmed(tx.tx_id, t, tx.extra_blob.clone()),
        };
        let intermediate = legacy_scan::scan_transaction(
          crypto,
          legacy_keys,
          tx.tx_id,
          origin_for,
          &tx.extra_blob,
          outputs,
          &tx.unlock_times,
        );
        for record in intermediate {
          if let Some(spend_privkey) = legacy_keys.spend_privkey {
            let one_time_privkey = record.record.enote_view_extension + spend_privkey;
            let key_image = crypto.derive_key_image(one_time_privkey, record.record.enote.onetime_address());
            result.legacy_full.push(ContextualLegacyRecord {
              record: record.record.into_full(key_image),
              origin: record.origin,
              spent: SpentContext::unspent(),
            });
          } else {
            result.legacy_intermediate.push(record);
          }
        }
      }
    }

    let mut sp_tagged_key_images: Vec<(KeyImage, KeyImageProtocolTag)> = Vec::new();
    let mut legacy_tagged_key_images: Vec<KeyImage> = Vec::new();
    for (key_image, tag) in &tx.input_key_images {
      match tag {
        KeyImageProtocolTag::Legacy => legacy_tagged_key_images.push(*key_image),
        _ => sp_tagged_key_images.push((*key_image, *tag)),
      }
    }

    let already_known_ours =
      tx.input_key_images.iter().any(|(ki, _)| ctx.owned_key_images.contains(ki));
    if already_known_ours {
      known_ours.insert(tx.tx_id);
    }

    let basic = if sp_ok {
      if let Some(sp_keys) = ctx.sp_keys {
        let input_context = crypto.hash_to_32("sp_input_context", &[&tx.tx_id]);
        sp_scan::find_received_scan(crypto, sp_keys.find_received_privkey, input_context, &extract_ephemeral(tx), outputs)
      } else {
        Vec::new()
      }
    } else {
      Vec::new()
    };

    let origin_for = |t: u64| match block_index {
      Some(index) => OriginContext::onchain(index, block_timestamp, tx.tx_id, t, tx.extra_blob.clone()),
      None => OriginContext::unconfirmed(tx.tx_id, t, tx.extra_blob.clone()),
    };
    let spent = match block_index {
      Some(index) => SpentContext::onchain(index, block_timestamp, tx.tx_id),
      None => SpentContext::unconfirmed(tx.tx_id),
    };

    let resolved = vec![false; basic.len()];
    work.push(TxWork {
      tx,
      origin_for: Box::new(origin_for),
      spent,
      basic,
      resolved,
      known_ours: already_known_ours,
      self_send_confirmed: false,
    });

    for (ki, tag) in &sp_tagged_key_images {
      let origin = if matches!(tag, KeyImageProtocolTag::SeraphisSelfSend) {
        KeyImageOrigin::SeraphisSelfSend
      } else {
        KeyImageOrigin::SeraphisNonSelfSend
      };
      result.key_images.push(KeyImageSighting { key_image: *ki, spent, origin });
    }
    for ki in &legacy_tagged_key_images {
      result.key_images.push(KeyImageSighting { key_image: *ki, spent, origin: KeyImageOrigin::Legacy });
    }
  }

  if let Some(sp_keys) = ctx.sp_keys {
    let mut discovered_key_images: HashSet<KeyImage> = ctx.owned_key_images.clone();
    run_plain_pass(
      crypto,
      sp_keys,
      &mut work,
      &mut result,
      &mut known_ours,
      &mut known_address_indices,
      &mut discovered_key_images,
    );
    run_self_send_fixpoint(
      crypto,
      sp_keys,
      &mut work,
      &mut result,
      &mut known_ours,
      &mut known_address_indices,
      &mut discovered_key_images,
    );
  }

  for w in &work {
    if !w.self_send_confirmed {
      continue;
    }
    for ki in &w.tx.input_key_images {
      if matches!(ki.1, KeyImageProtocolTag::Legacy) {
        result.cached_legacy_key_images_from_selfsend.push((ki.0, w.spent));
      }
    }
  }

  result
}

/// The seraphis ephemeral pubkey(s) share the memo blob with the legacy ones (`crate::memo`):
/// they follow immediately after the legacy section, in the same count-byte-then-pubkeys layout,
/// but on the Montgomery curve since seraphis ephemeral Diffie-Hellman happens there.
fn extract_ephemeral(tx: &ChunkTx) -> Vec<enote_crypto::XPoint> {
  let legacy_len = match crate::memo::EphemeralPubkeys::parse(&tx.extra_blob) {
    Some(pubkeys) => 1 + 32 * (1 + pubkeys.additional.len()),
    None => 0,
  };
  let rest = &tx.extra_blob[legacy_len.min(tx.extra_blob.len()) ..];
  if rest.is_empty() {
    return Vec::new();
  }

  let count = rest[0] as usize;
  let mut offset = 1;
  let Some(main) = read_xpoint(rest, &mut offset) else { return Vec::new() };
  let mut out = vec![main];
  for _ in 0 .. count {
    match read_xpoint(rest, &mut offset) {
      Some(point) => out.push(point),
      None => break,
    }
  }
  out
}

fn read_xpoint(blob: &[u8], offset: &mut usize) -> Option<enote_crypto::XPoint> {
  let slice = blob.get(*offset .. *offset + 32)?;
  let mut bytes = [0u8; 32];
  bytes.copy_from_slice(slice);
  *offset += 32;
  Some(enote_crypto::XPoint::from(bytes))
}

fn run_plain_pass(
  crypto: &impl CryptoAdapter,
  sp_keys: &SeraphisKeys,
  work: &mut [TxWork<'_>],
  result: &mut ChunkResult,
  known_ours: &mut HashSet<TxId>,
  known_address_indices: &mut HashSet<u32>,
  discovered_key_images: &mut HashSet<KeyImage>,
) {
  for w in work.iter_mut() {
    for (i, basic) in w.basic.iter().enumerate() {
      if sp_keys.is_full() {
        if let Some(full) = sp_scan::try_resolve_plain_full(crypto, sp_keys, basic) {
          w.resolved[i] = true;
          w.known_ours = true;
          known_ours.insert(w.tx.tx_id);
          known_address_indices.insert(full.address_index);
          discovered_key_images.insert(full.key_image);
          result.sp_full.push(ContextualSeraphisRecord {
            record: full,
            origin: (w.origin_for)(i as u64),
            spent: SpentContext::unspent(),
          });
          continue;
        }
      } else if let Some(intermediate) = sp_scan::try_resolve_plain_intermediate(crypto, sp_keys, basic) {
        w.resolved[i] = true;
        w.known_ours = true;
        known_ours.insert(w.tx.tx_id);
        known_address_indices.insert(intermediate.address_index);
        result.sp_intermediate.push(ContextualSeraphisIntermediateRecord {
          record: intermediate,
          origin: (w.origin_for)(i as u64),
        });
      }
    }
  }
}

/// Iterate the self-send pass until no new tx is flagged "ours" (`spec.md` §4.2.3): a tx is ours
/// either because one of its inputs spends an already-known enote, or because one of its own
/// outputs resolves as a self-send; either discovery can in turn make some other tx's inputs
/// newly recognizable, so this keeps looping until a full pass makes no further progress.
fn run_self_send_fixpoint(
  crypto: &impl CryptoAdapter,
  sp_keys: &SeraphisKeys,
  work: &mut [TxWork<'_>],
  result: &mut ChunkResult,
  known_ours: &mut HashSet<TxId>,
  known_address_indices: &mut HashSet<u32>,
  discovered_key_images: &mut HashSet<KeyImage>,
) {
  if !sp_keys.is_full() {
    return;
  }

  loop {
    let mut changed = false;

    // A tx whose inputs spend any enote we now know we own becomes "ours" too.
    for w in work.iter_mut() {
      if w.known_ours {
        continue;
      }
      let spends_known = w.tx.input_key_images.iter().any(|(ki, _)| discovered_key_images.contains(ki));
      if spends_known && known_ours.insert(w.tx.tx_id) {
        w.known_ours = true;
        changed = true;
      }
    }

    for w in work.iter_mut() {
      if !w.known_ours {
        continue;
      }

      for (i, basic) in w.basic.iter().enumerate() {
        if w.resolved[i] {
          continue;
        }
        let mut candidates: Vec<u32> = known_address_indices.iter().copied().collect();
        candidates.sort_unstable();
        for candidate in candidates {
          if let Some(full) = sp_scan::try_resolve_self_send(crypto, sp_keys, basic, candidate) {
            w.resolved[i] = true;
            w.self_send_confirmed = true;
            discovered_key_images.insert(full.key_image);
            if known_address_indices.insert(full.address_index) {
              changed = true;
            }
            result.sp_full.push(ContextualSeraphisRecord {
              record: full,
              origin: (w.origin_for)(i as u64),
              spent: SpentContext::unspent(),
            });
            changed = true;
            break;
          }
        }
      }
    }

    if !changed {
      break;
    }
  }
}
