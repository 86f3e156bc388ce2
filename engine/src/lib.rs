//! Enote scanning and balance-recovery engine for a dual-protocol (legacy CryptoNote/RingCT and
//! Seraphis/Jamtis) view-key wallet.
//!
//! This crate turns a stream of transactions from an external ledger into a local, queryable
//! store of owned enotes and their spent status, without ever needing the wallet's spend
//! authority except where the caller explicitly supplies it. Transaction construction, proof
//! verification, and networking are all out of scope; see the [`ledger`] module for the boundary
//! this crate expects a host application to fill.

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod address_tag;
pub mod chunk;
pub mod config;
pub mod context;
pub mod enote;
pub mod error;
pub mod events;
pub mod identifier;
pub mod import_cycle;
pub mod keys;
pub mod ledger;
pub mod legacy_scan;
pub mod machine;
pub mod memo;
pub mod mock;
pub mod record;
pub mod sp_scan;
pub mod store;

pub use config::ScanConfig;
pub use context::{BlockIndex, OriginContext, OriginStatus, SpentContext, SpentStatus, TxId};
pub use enote::EnoteVariant;
pub use error::{EngineError, EngineResult};
pub use events::{EnoteStoreEvent, EventSink, NullEventSink, VecEventSink};
pub use identifier::Identifier;
pub use keys::{LegacyKeys, SeraphisKeys, SubaddressIndex};
pub use ledger::{ChunkTx, LedgerAdapter, LedgerChunk, NonLedgerChunk};
pub use machine::{ScanMachine, ScanOutcome};
pub use store::{BalanceExclusions, BalanceFilter, EnoteStore};
