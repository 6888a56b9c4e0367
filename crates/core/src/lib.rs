//! Provisioning and verification of access-control smart cards
//!
//! This crate turns a long-lived system secret and a set of per-realm
//! static secrets into card-specific cryptographic material, writes that
//! material and a signed authenticity record onto a card, and later
//! proves against an untrusted card that the card was legitimately
//! issued for a given realm.
//!
//! The pieces, leaves first:
//!
//! - [`kdf`]: deterministic HMAC-based derivation of diversified card keys.
//! - [`sig`]: ECDSA P-384 signing and verification of a realm's
//!   association identifier, plus PEM key-pair serialization.
//! - [`Realm`]: one access domain, mapped onto one card application.
//! - [`issue`]: drives a [`CardSession`](gatehouse_card::CardSession)
//!   through the fixed provisioning sequence.
//! - [`authenticate_realm`]: challenges an issued card for one realm.
//!
//! Card transport is not this crate's concern; anything implementing the
//! `CardSession` trait from `gatehouse-card` will do.
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub mod kdf;
pub mod sig;

mod error;
mod issue;
mod realm;
mod request;
mod verify;

pub use error::{Error, ErrorKind, Result};
pub use issue::{issue, recover};
pub use realm::{
    ASSOCIATION_ID_LEN, AUTH_KEY_SLOT, MASTER_KEY_SLOT, READ_KEY_SLOT, Realm, UPDATE_KEY_SLOT,
    decode_association_id, encode_association_id,
};
pub use request::{IssueRequest, RealmDescriptor};
pub use verify::authenticate_realm;
