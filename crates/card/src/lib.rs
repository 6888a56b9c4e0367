//! Card-session boundary for the gatehouse provisioning system
//!
//! This crate defines everything the provisioning and authentication
//! protocols need to know about a contactless card: application
//! identifiers, key material types, the [`CardSession`] operation set,
//! and tag discovery. The wire-level contactless protocol (framing,
//! anticollision, the ISO layer) deliberately lives *below* this
//! boundary and is not part of this workspace.
//!
//! The optional `emulator` feature provides an in-memory card
//! implementing [`CardSession`], used by the test suites and the CLI's
//! exercise mode.
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

mod aid;
mod discover;
mod error;
mod session;
mod types;

#[cfg(feature = "emulator")]
pub mod emulator;

pub use aid::{Aid, InvalidSlot, Slot};
pub use discover::{DiscoveredTag, POLL_INTERVAL, TagKind, TagSource, wait_for_card};
pub use error::CardError;
pub use session::CardSession;
pub use types::{AES_KEY_LEN, AccessRights, AesKey, CardConfig, CommMode, KeyConfig, Uid};
