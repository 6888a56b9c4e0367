//! Card authentication.
//!
//! [`authenticate_realm`] challenges an issued card for one realm. The
//! card is untrusted throughout: every gate must pass, in a fixed
//! order, before anything read from it is believed. A failure at any
//! step rejects the card outright.

use gatehouse_card::CardSession;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::issue::{AUTHENTICITY_FILE, IDENTIFIER_FILE};
use crate::kdf::derive_key;
use crate::realm::{
    ASSOCIATION_ID_LEN, AUTH_KEY_SLOT, READ_KEY_SLOT, Realm, decode_association_id,
};
use crate::sig::{self, AuthenticityRecord, COMPONENT_LEN};
use crate::{Error, Result};

/// Authenticate a card against a realm, returning the association id it
/// proved possession of.
///
/// The gates, in order: static read-key authentication, identifier read
/// and decode, authentication with the key diversified from that
/// identifier (possession proof; a card that merely copied another
/// card's files fails here), authenticity-record read and signature
/// verification under the realm's public key, and finally comparison
/// against the expected association id. All-or-nothing; errors carry an
/// [`ErrorKind`](crate::ErrorKind) separating card faults from
/// integrity failures.
pub fn authenticate_realm<S: CardSession>(session: &mut S, realm: &Realm) -> Result<Uuid> {
    let aid = realm.aid();
    debug!(realm = %realm.name, %aid, "authenticating card");

    session.select_application(aid)?;
    session.authenticate(READ_KEY_SLOT, &realm.read_key())?;

    let mut identifier = [0u8; ASSOCIATION_ID_LEN];
    read_exact(session, IDENTIFIER_FILE, 0, &mut identifier)?;
    let card_id = decode_association_id(&identifier).map_err(|_| {
        warn!(realm = %realm.name, "identifier file did not decode");
        Error::IdentifierCorrupt(String::from_utf8_lossy(&identifier).into_owned())
    })?;
    let canonical_id = card_id.to_string();

    let auth_key = derive_key(&realm.auth_secret, aid, AUTH_KEY_SLOT, canonical_id.as_bytes());
    session.authenticate(AUTH_KEY_SLOT, &auth_key)?;

    let mut r = [0u8; COMPONENT_LEN];
    let mut s = [0u8; COMPONENT_LEN];
    read_exact(session, AUTHENTICITY_FILE, 0, &mut r)?;
    read_exact(session, AUTHENTICITY_FILE, COMPONENT_LEN as u32, &mut s)?;
    let record = AuthenticityRecord::from_components(&r, &s)?;

    if !sig::verify(&realm.public_key, canonical_id.as_bytes(), &record) {
        warn!(realm = %realm.name, id = %canonical_id, "authenticity record rejected");
        return Err(Error::AuthenticityInvalid(canonical_id));
    }

    if card_id != realm.association_id {
        warn!(
            realm = %realm.name,
            expected = %realm.association_id,
            actual = %card_id,
            "card belongs to a different association",
        );
        return Err(Error::IdentifierMismatch {
            expected: realm.canonical_id(),
            actual: canonical_id,
        });
    }

    info!(realm = %realm.name, id = %canonical_id, "card authenticated");
    Ok(card_id)
}

fn read_exact<S: CardSession>(
    session: &mut S,
    file: u8,
    offset: u32,
    buf: &mut [u8],
) -> Result<()> {
    let read = session.read_data(file, offset, buf)?;
    if read != buf.len() {
        return Err(Error::ShortRead {
            file,
            expected: buf.len(),
            actual: read,
        });
    }
    Ok(())
}
