//! Domain model and pure logic for portal notification reconciliation.
//!
//! Nothing in this crate performs I/O. The extractor turns a [`DocumentModel`]
//! into [`ObservedItem`]s, the delta engine compares two observations, and the
//! delivery module shapes new items into push messages. Portal access, push
//! transport and orchestration live in `notify-host`.

pub mod account;
pub mod delivery;
pub mod delta;
pub mod document;
pub mod extract;
pub mod item;

pub use account::{Account, PortalCredentials};
pub use delivery::{
    DeliveryCandidate, DeliveryResult, LocalizedBody, MessageTemplates, PushMessage,
};
pub use delta::{PREFIX_MATCH_CHARS, diff, same_item};
pub use document::{DocumentLink, DocumentModel};
pub use extract::{Extraction, Extractor, ExtractorConfig, VisitRef, extract, parse_visit_id};
pub use item::{ItemCategory, MAX_ITEM_TEXT_CHARS, ObservedItem, truncate_chars};
