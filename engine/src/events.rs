//! The enote store's event stream (`spec.md` §3.6).
//!
//! Every mutating store call emits zero or more of these before returning, carrying enough data
//! for an external persistence layer to replay without re-deriving anything.

use enote_crypto::KeyImage;

use crate::identifier::Identifier;

/// A single store mutation, emitted to an [`EventSink`].
#[derive(Clone, Debug)]
pub enum EnoteStoreEvent {
  /// A new legacy intermediate (view-only, no key image) record was inserted.
  NewLegacyIntermediate(Identifier),
  /// A new legacy full record was inserted.
  NewLegacyFull(Identifier),
  /// A new seraphis record was inserted.
  NewSeraphis(KeyImage),
  /// A legacy record's origin context was cleared (its block was reorged away), carrying the
  /// block index it had been anchored to.
  ClearedLegacyOrigin(Identifier, u64),
  /// A record's spent context was cleared (its spend was reorged away or invalidated).
  ClearedSpent(KeyImage),
  /// An existing legacy record's origin context was strictly improved (`spec.md` §4.3.1).
  UpdatedOrigin(Identifier),
  /// An existing seraphis record's origin context was strictly improved.
  UpdatedOriginSeraphis(KeyImage),
  /// An existing record's spent context was strictly improved.
  UpdatedSpent(KeyImage),
  /// A legacy intermediate record was promoted to full via key-image import.
  LegacyIntermediatePromoted(Identifier, KeyImage),
}

/// A sink for store-mutation events.
///
/// Callbacks must not re-enter the store (`spec.md` §6): an implementation that tried to query
/// or mutate the store from inside `on_event` would deadlock or observe a store mid-mutation.
pub trait EventSink {
  /// Receive one event. Called synchronously, in emission order, before the mutating call
  /// returns.
  fn on_event(&mut self, event: EnoteStoreEvent);
}

/// An [`EventSink`] that discards everything; useful for tests and for callers with no
/// persistence layer.
#[derive(Clone, Copy, Default, Debug)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
  fn on_event(&mut self, _event: EnoteStoreEvent) {}
}

/// An [`EventSink`] that simply accumulates everything in a `Vec`, useful for tests that assert
/// on the exact event sequence.
#[derive(Default, Debug)]
pub struct VecEventSink(pub Vec<EnoteStoreEvent>);

impl EventSink for VecEventSink {
  fn on_event(&mut self, event: EnoteStoreEvent) {
    self.0.push(event);
  }
}
