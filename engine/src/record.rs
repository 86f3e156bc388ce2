//! Contextual basic / intermediate / full records (`spec.md` §3.3, §3.4), grounded directly on
//! `enote_record_types.h` of the protocol this engine's scans were distilled from.

use enote_crypto::{KeyImage, Point, Scalar, XPoint};

use crate::{
  context::{OriginContext, SpentContext, TxId},
  enote::EnoteVariant,
  keys::SubaddressIndex,
  address_tag::AddressTag,
};

/// Which Jamtis enote type a fully-resolved Seraphis record turned out to be.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SeraphisEnoteType {
  /// Resolved via the plain (cipherable address-tag) pass.
  Plain,
  /// Resolved via the self-send pass (`spec.md` §4.2.3).
  SelfSend,
}

/// A legacy enote identified as owned by view-key scanning alone, with nothing decoded yet.
#[derive(Clone, Debug)]
pub struct LegacyBasicRecord {
  /// The original enote.
  pub enote: EnoteVariant,
  /// The enote's (possibly tx-shared) ephemeral public key.
  pub ephemeral_pubkey: Point,
  /// The matched address index, if owned by a subaddress.
  pub address_index: Option<SubaddressIndex>,
  /// The enote's index within its transaction.
  pub tx_output_index: u64,
  /// The output's unlock time.
  pub unlock_time: u64,
}

/// A legacy enote that has been view-scanned: amount and blinding factor are known, but no key
/// image (spend authority wasn't available).
#[derive(Clone, Debug)]
pub struct LegacyIntermediateRecord {
  /// The original enote.
  pub enote: EnoteVariant,
  /// The enote's ephemeral public key.
  pub ephemeral_pubkey: Point,
  /// The per-output view-key extension `Hn(D_t, t)` (plus subaddress offset, if applicable).
  pub enote_view_extension: Scalar,
  /// The decoded amount.
  pub amount: u64,
  /// The decoded blinding factor.
  pub amount_blinding_factor: Scalar,
  /// The matched address index, if owned by a subaddress.
  pub address_index: Option<SubaddressIndex>,
  /// The enote's index within its transaction.
  pub tx_output_index: u64,
  /// The output's unlock time.
  pub unlock_time: u64,
}

/// A legacy enote that has been view-scanned and had its key image computed.
#[derive(Clone, Debug)]
pub struct LegacyFullRecord {
  /// The original enote.
  pub enote: EnoteVariant,
  /// The enote's ephemeral public key.
  pub ephemeral_pubkey: Point,
  /// The per-output view-key extension.
  pub enote_view_extension: Scalar,
  /// The decoded amount.
  pub amount: u64,
  /// The decoded blinding factor.
  pub amount_blinding_factor: Scalar,
  /// The enote's key image.
  pub key_image: KeyImage,
  /// The matched address index, if owned by a subaddress.
  pub address_index: Option<SubaddressIndex>,
  /// The enote's index within its transaction.
  pub tx_output_index: u64,
  /// The output's unlock time.
  pub unlock_time: u64,
}

impl LegacyIntermediateRecord {
  /// Promote this record to full, now that a key image is available (the two-phase import
  /// cycle, `spec.md` §4.3.4).
  pub fn into_full(self, key_image: KeyImage) -> LegacyFullRecord {
    LegacyFullRecord {
      enote: self.enote,
      ephemeral_pubkey: self.ephemeral_pubkey,
      enote_view_extension: self.enote_view_extension,
      amount: self.amount,
      amount_blinding_factor: self.amount_blinding_factor,
      key_image,
      address_index: self.address_index,
      tx_output_index: self.tx_output_index,
      unlock_time: self.unlock_time,
    }
  }
}

/// A Seraphis enote that passed the view-tag check; nothing about ownership beyond that is known
/// yet.
#[derive(Clone, Debug)]
pub struct SeraphisBasicRecord {
  /// The original enote.
  pub enote: EnoteVariant,
  /// The enote's ephemeral public key (Montgomery form).
  pub ephemeral_pubkey: XPoint,
  /// The per-enote shared secret `D_t = x_fr * R_t`, carried forward so later passes don't need
  /// `x_fr` again.
  pub shared_secret: XPoint,
  /// The input context of the tx this enote's inputs belong to (used for self-send resolution).
  pub input_context: [u8; 32],
  /// The nominal (not yet verified) ciphered address tag, for non-selfsend enote types.
  pub nominal_address_tag: AddressTag,
}

/// A Seraphis enote resolved via the plain pass (non-selfsend), with amount decoded but no key
/// image (view-balance key wasn't available).
#[derive(Clone, Debug)]
pub struct SeraphisIntermediateRecord {
  /// The original enote.
  pub enote: EnoteVariant,
  /// The enote's ephemeral public key.
  pub ephemeral_pubkey: XPoint,
  /// The input context of the owning tx.
  pub input_context: [u8; 32],
  /// The decoded amount.
  pub amount: u64,
  /// The decoded blinding factor.
  pub amount_blinding_factor: Scalar,
  /// The jamtis address index this enote was sent to.
  pub address_index: u32,
}

/// A fully view-scanned Seraphis enote (all jamtis enote types, including self-send).
#[derive(Clone, Debug)]
pub struct SeraphisFullRecord {
  /// The original enote.
  pub enote: EnoteVariant,
  /// The enote's ephemeral public key.
  pub ephemeral_pubkey: XPoint,
  /// The input context of the owning tx.
  pub input_context: [u8; 32],
  /// The `G`-component view extension.
  pub view_extension_g: Scalar,
  /// The `X`-component view extension.
  pub view_extension_x: Scalar,
  /// The `U`-component view extension.
  pub view_extension_u: Scalar,
  /// The decoded amount.
  pub amount: u64,
  /// The decoded blinding factor.
  pub amount_blinding_factor: Scalar,
  /// The enote's key image.
  pub key_image: KeyImage,
  /// The jamtis address index this enote was sent to.
  pub address_index: u32,
  /// Which jamtis enote type this resolved to.
  pub enote_type: SeraphisEnoteType,
}

/// A basic record plus the origin context it was found with, before protocol-specific
/// processing splits legacy from Seraphis.
#[derive(Clone, Debug)]
pub enum ContextualBasicRecord {
  /// A legacy basic record.
  Legacy(LegacyBasicRecord, OriginContext),
  /// A Seraphis basic record.
  Seraphis(SeraphisBasicRecord, OriginContext),
}

impl ContextualBasicRecord {
  /// The transaction id this basic record's origin context refers to.
  pub fn tx_id(&self) -> TxId {
    match self {
      Self::Legacy(_, origin) | Self::Seraphis(_, origin) => origin.tx_id,
    }
  }
}

/// A legacy intermediate record plus its origin context.
#[derive(Clone, Debug)]
pub struct ContextualLegacyIntermediateRecord {
  /// The decoded record.
  pub record: LegacyIntermediateRecord,
  /// Where it was found.
  pub origin: OriginContext,
}

/// A legacy full record plus its origin and spent contexts.
#[derive(Clone, Debug)]
pub struct ContextualLegacyRecord {
  /// The decoded record.
  pub record: LegacyFullRecord,
  /// Where it was found.
  pub origin: OriginContext,
  /// If and when it was spent.
  pub spent: SpentContext,
}

/// A Seraphis intermediate record plus its origin context.
#[derive(Clone, Debug)]
pub struct ContextualSeraphisIntermediateRecord {
  /// The decoded record.
  pub record: SeraphisIntermediateRecord,
  /// Where it was found.
  pub origin: OriginContext,
}

/// A Seraphis full record plus its origin and spent contexts.
#[derive(Clone, Debug)]
pub struct ContextualSeraphisRecord {
  /// The decoded record.
  pub record: SeraphisFullRecord,
  /// Where it was found.
  pub origin: OriginContext,
  /// If and when it was spent.
  pub spent: SpentContext,
}
