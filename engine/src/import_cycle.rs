//! The two-phase legacy key-image import cycle (`spec.md` §4.3.4).
//!
//! A view-only wallet instance can decode legacy enotes (amount, blinding factor) but not derive
//! their key images, since that needs the spend private key. The cycle lets an external signer
//! (holding the spend key) supply `(one_time_address, key_image)` pairs back, which this module
//! promotes the matching intermediate records with.

use enote_crypto::{KeyImage, Point};

use crate::{
  context::SpentContext,
  error::{EngineError, EngineResult},
  events::{EnoteStoreEvent, EventSink},
  record::ContextualLegacyRecord,
  store::EnoteStore,
};

/// A snapshot opened by [`make_ki_import_checkpoint`], closed by [`finish_ki_import_cycle`].
///
/// Holds the block height the import is catching up to, so the caller can tell afterwards
/// whether every intermediate record up to that height was actually promoted.
pub struct KeyImageImportCheckpoint {
  through_block: u64,
}

/// Begin an import cycle: snapshot the highest block the store's legacy scan has reached. Call
/// this before a key-image-only re-scan (`spec.md` §4.3.4 step 4), since new intermediate records
/// found while the import cycle is open should not be considered part of this checkpoint.
pub fn make_ki_import_checkpoint(store: &EnoteStore) -> KeyImageImportCheckpoint {
  let through_block = store.top_legacy_partialscanned.unwrap_or(store.refresh_index);
  log::debug!("opened key-image import checkpoint at block {through_block}");
  KeyImageImportCheckpoint { through_block }
}

/// Apply one batch of `(one_time_address, key_image)` pairs recovered by the external signer,
/// promoting every matching intermediate record to full.
///
/// This cannot cryptographically verify that `key_image` is really `x * Hp(one_time_address)`
/// for the corresponding spend scalar `x`: that check needs the spend private key, which by
/// design never reaches this (view-only) side. It can only check that `one_time_address` matches
/// a pending intermediate record; a signer that lies about the key image poisons the store the
/// same way an honest but buggy signer would, and is out of this engine's threat model
/// (`spec.md` §1).
///
/// The whole batch is validated before anything is mutated (`spec.md` §7's
/// `InvalidKeyImageImport` row: "reject the whole import batch; store unchanged"), so a single
/// unknown `one_time_address` anywhere in `pairs` leaves the store exactly as it was.
pub fn import_legacy_key_images(
  store: &mut EnoteStore,
  pairs: &[(Point, KeyImage)],
  sink: &mut impl EventSink,
) -> EngineResult<u32> {
  for &(onetime_address, _) in pairs {
    if !store.legacy_onetime_to_identifiers.contains_key(&onetime_address) {
      return Err(EngineError::InvalidKeyImageImport);
    }
  }

  let mut imported = 0u32;

  for &(onetime_address, key_image) in pairs {
    let identifiers = store.legacy_onetime_to_identifiers.get(&onetime_address).cloned().unwrap_or_default();

    for identifier in identifiers {
      let Some(intermediate) = store.legacy_intermediate_records.remove(&identifier) else { continue };
      sink.on_event(EnoteStoreEvent::LegacyIntermediatePromoted(identifier, key_image));

      let full = ContextualLegacyRecord {
        record: intermediate.record.into_full(key_image),
        origin: intermediate.origin,
        spent: SpentContext::unspent(),
      };
      store.legacy_records.insert(identifier, full);
      sink.on_event(EnoteStoreEvent::NewLegacyFull(identifier));

      // Matches `EnoteStore::insert_legacy_full`'s own consult-then-apply step: a spend might
      // have been observed (and cached) before this enote's key image was known at all.
      if let Some(spent) = store.tracked_legacy_key_images.remove(&key_image) {
        store.apply_legacy_key_image(key_image, spent, sink);
      }

      imported += 1;
    }
  }

  Ok(imported)
}

/// Close an import cycle: advance `top_legacy_fullscanned` to the checkpoint's height if every
/// intermediate record originating at or before it was promoted, otherwise leave it unchanged and
/// report the number still outstanding so the caller can retry or accept partial coverage.
pub fn finish_ki_import_cycle(store: &mut EnoteStore, checkpoint: KeyImageImportCheckpoint) -> u32 {
  let outstanding = store
    .legacy_intermediate_records
    .values()
    .filter(|record| {
      record.origin.block_index.confirmed().is_some_and(|block| block <= checkpoint.through_block)
    })
    .count();

  if outstanding == 0 {
    // Guard against a reorg that ran concurrently with steps 2-4 (`spec.md` §4.3.4 step 5):
    // clamp to the store's current partialscan height so I2 (`fullscanned <= partialscanned`)
    // can never be violated by a checkpoint opened before the rollback.
    let target = checkpoint.through_block.min(store.top_legacy_partialscanned.unwrap_or(0));
    store.top_legacy_fullscanned = Some(store.top_legacy_fullscanned.map_or(target, |cur| cur.max(target)));
    log::debug!("key-image import cycle complete through block {target}");
  } else {
    log::warn!(
      "key-image import cycle through block {} left {outstanding} intermediate record(s) unpromoted",
      checkpoint.through_block
    );
  }

  u32::try_from(outstanding).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
  use enote_crypto::{Ed25519CryptoAdapter, Scalar};

  use super::*;
  use crate::{
    config::ScanConfig,
    context::{OriginContext, SpentStatus},
    enote::{EnoteVariant, LegacyV1},
    events::NullEventSink,
    identifier::Identifier,
    record::{ContextualLegacyIntermediateRecord, LegacyIntermediateRecord},
  };

  const CRYPTO: Ed25519CryptoAdapter = Ed25519CryptoAdapter;

  fn seed_intermediate(store: &mut EnoteStore, onetime_address: Point, amount: u64) -> Identifier {
    let identifier = Identifier::compute(&CRYPTO, onetime_address, amount);
    store.legacy_onetime_to_identifiers.entry(onetime_address).or_default().insert(identifier);
    store.legacy_intermediate_records.insert(
      identifier,
      ContextualLegacyIntermediateRecord {
        record: LegacyIntermediateRecord {
          enote: EnoteVariant::LegacyV1(LegacyV1 { onetime_address, amount }),
          ephemeral_pubkey: Point::generator(),
          enote_view_extension: Scalar::ZERO,
          amount,
          amount_blinding_factor: Scalar::ZERO,
          address_index: None,
          tx_output_index: 0,
          unlock_time: 0,
        },
        origin: OriginContext::onchain(0, 0, [0; 32], 0, Vec::new()),
      },
    );
    identifier
  }

  #[test]
  fn import_without_matching_intermediate_record_errors() {
    let mut store = EnoteStore::new(0, &ScanConfig::default());
    let bogus = Point::identity();
    let key_image = KeyImage::from_point(Point::identity());
    let result = import_legacy_key_images(&mut store, &[(bogus, key_image)], &mut NullEventSink);
    assert!(result.is_err());
  }

  /// `spec.md` §7's `InvalidKeyImageImport` row: a bad pair anywhere in the batch rejects the
  /// whole batch, leaving even the good pairs unpromoted.
  #[test]
  fn a_bad_pair_rejects_the_whole_batch_leaving_good_pairs_untouched() {
    let mut store = EnoteStore::new(0, &ScanConfig::default());
    let good_ko = Point::mul_base(Scalar::from(5u64));
    let good_identifier = seed_intermediate(&mut store, good_ko, 7);

    let bogus_ko = Point::identity();
    let good_ki = KeyImage::from_point(Point::mul_base(Scalar::from(6u64)));
    let bogus_ki = KeyImage::from_point(Point::identity());

    let result = import_legacy_key_images(
      &mut store,
      &[(good_ko, good_ki), (bogus_ko, bogus_ki)],
      &mut NullEventSink,
    );

    assert!(result.is_err());
    assert!(store.legacy_intermediate_records.contains_key(&good_identifier));
    assert!(!store.legacy_records.contains_key(&good_identifier));
  }

  /// `spec.md` §4.3.4 step 3: a spent context cached under `tracked_legacy_key_images` before the
  /// key image was known is applied to the record the moment it's promoted, the same way
  /// `EnoteStore::insert_legacy_full` applies it for a record discovered by an ordinary scan.
  #[test]
  fn promoting_a_record_applies_its_cached_spent_context() {
    let mut store = EnoteStore::new(0, &ScanConfig::default());
    let ko = Point::mul_base(Scalar::from(9u64));
    let identifier = seed_intermediate(&mut store, ko, 3);
    let key_image = KeyImage::from_point(Point::mul_base(Scalar::from(10u64)));

    store.tracked_legacy_key_images.insert(key_image, SpentContext::onchain(1, 0, [2; 32]));

    let imported = import_legacy_key_images(&mut store, &[(ko, key_image)], &mut NullEventSink).unwrap();

    assert_eq!(imported, 1);
    assert_eq!(store.legacy_records[&identifier].spent.spent_status, SpentStatus::SpentOnchain);
    assert!(!store.tracked_legacy_key_images.contains_key(&key_image));
  }

  #[test]
  fn checkpoint_with_no_pending_records_closes_immediately() {
    let mut store = EnoteStore::new(0, &ScanConfig::default());
    let checkpoint = make_ki_import_checkpoint(&store);
    let outstanding = finish_ki_import_cycle(&mut store, checkpoint);
    assert_eq!(outstanding, 0);
    assert_eq!(store.top_legacy_fullscanned, Some(0));
  }
}
