//! Card provisioning.
//!
//! [`issue`] drives a card session through the full provisioning pass:
//! one application per realm, then the PICC-level lockdown. The pass is
//! prepare-then-drive: every key derivation and the signing of every
//! authenticity record happen before the first card mutation, so a
//! derivation or signing failure never leaves a half-written card.
//!
//! Card mutations themselves are fail-fast with no rollback. The PICC
//! master key rotation is deliberately the last mutation of the pass;
//! [`recover`] relies on that ordering.

use gatehouse_card::{
    AccessRights, AesKey, Aid, CardConfig, CardSession, CommMode, KeyConfig, Uid,
};
use tracing::{debug, info, warn};

use crate::kdf::derive_key;
use crate::realm::{
    ASSOCIATION_ID_LEN, AUTH_KEY_SLOT, MASTER_KEY_SLOT, READ_KEY_SLOT, Realm, UPDATE_KEY_SLOT,
    encode_association_id,
};
use crate::sig::{self, AuthenticityRecord, COMPONENT_LEN};
use crate::{Error, Result};

// Key settings: applications are created permissive (master key may
// rotate other keys) and locked once fully populated. The PICC settings
// are relaxed just long enough to rotate its master key.
const INITIAL_APP_SETTINGS: u8 = 0x09;
const FINAL_APP_SETTINGS: u8 = 0xE0;
const INITIAL_PICC_SETTINGS: u8 = 0x09;
const FINAL_PICC_SETTINGS: u8 = 0x08;

// Access rights words. The identifier file is created world-writable in
// plain mode so it can be populated before any key is rotated, then
// sealed to read-key-only enciphered access. The authenticity file is
// enciphered from the start.
const INITIAL_IDENTIFIER_RIGHTS: AccessRights = AccessRights::from_raw(0x0000);
const FINAL_IDENTIFIER_RIGHTS: AccessRights = AccessRights::from_raw(0x1FFF);
const AUTHENTICITY_RIGHTS: AccessRights = AccessRights::from_raw(0x2F33);

/// File holding the association identifier, dashless ASCII form.
pub(crate) const IDENTIFIER_FILE: u8 = 1;
/// File holding the authenticity record, R then S.
pub(crate) const AUTHENTICITY_FILE: u8 = 2;

/// Every realm application carries four AES key slots.
const APP_KEYS: KeyConfig = KeyConfig::aes(4);

/// Card-ready material for one realm, fully computed before the card is
/// touched.
struct RealmMaterial {
    aid: Aid,
    master_key: AesKey,
    read_key: AesKey,
    auth_key: AesKey,
    update_key: AesKey,
    identifier: [u8; ASSOCIATION_ID_LEN],
    record: AuthenticityRecord,
}

impl RealmMaterial {
    fn prepare(system_secret: &[u8], uid: &Uid, realm: &Realm) -> Result<Self> {
        let aid = realm.aid();
        let uid_hex = uid.hex();
        let canonical_id = realm.canonical_id();

        Ok(Self {
            aid,
            master_key: derive_key(system_secret, aid, MASTER_KEY_SLOT, uid_hex.as_bytes()),
            read_key: realm.read_key(),
            auth_key: derive_key(system_secret, aid, AUTH_KEY_SLOT, canonical_id.as_bytes()),
            update_key: derive_key(system_secret, aid, UPDATE_KEY_SLOT, canonical_id.as_bytes()),
            identifier: encode_association_id(&realm.association_id),
            record: sig::sign(&realm.private_key, canonical_id.as_bytes())?,
        })
    }
}

/// Handle to a data file created during the current pass.
///
/// Writes go through this handle, so writing a file that was never
/// created does not typecheck.
struct CreatedFile<'s, S: CardSession> {
    session: &'s mut S,
    file: u8,
}

impl<'s, S: CardSession> CreatedFile<'s, S> {
    fn create(
        session: &'s mut S,
        file: u8,
        comm: CommMode,
        rights: AccessRights,
        size: u32,
    ) -> Result<Self> {
        session.create_data_file(file, comm, rights, size)?;
        Ok(Self { session, file })
    }

    /// Write `data` at `offset`, treating a short write as an error.
    fn write_exact(&mut self, offset: u32, data: &[u8]) -> Result<()> {
        let written = self.session.write_data(self.file, offset, data)?;
        if written != data.len() {
            return Err(Error::ShortWrite {
                file: self.file,
                expected: data.len(),
                actual: written,
            });
        }
        Ok(())
    }

    /// Tighten the file's communication mode and access rights.
    fn seal(self, comm: CommMode, rights: AccessRights) -> Result<()> {
        self.session.change_file_settings(self.file, comm, rights)?;
        Ok(())
    }
}

/// Provision a blank card for the given realms.
///
/// Expects a factory-keyed card. Creates one application per realm in
/// request order, then rotates the PICC master key to its card-specific
/// derived value, locks the PICC key settings, and enables random-uid
/// mode. Returns the card's physical uid, which the operator should
/// record: it stops being readable over the air once random-uid mode is
/// active.
///
/// Fails fast on the first card error with no rollback; a card left
/// half-provisioned still carries the factory PICC master key (the PICC
/// rotation is the final mutation) and can be reset with [`recover`].
pub fn issue<S: CardSession>(
    session: &mut S,
    system_secret: &[u8],
    realms: &[Realm],
) -> Result<Uid> {
    let uid = session.uid()?;
    info!(%uid, realms = realms.len(), "issuing card");

    let picc_key = derive_key(
        system_secret,
        Aid::MASTER,
        MASTER_KEY_SLOT,
        uid.hex().as_bytes(),
    );
    let prepared = realms
        .iter()
        .map(|realm| RealmMaterial::prepare(system_secret, &uid, realm))
        .collect::<Result<Vec<_>>>()?;

    for (realm, material) in realms.iter().zip(&prepared) {
        info!(realm = %realm.name, aid = %material.aid, "provisioning realm application");
        provision_realm(session, material)?;
    }

    finalize_picc(session, &picc_key)?;

    info!(%uid, "card issued");
    Ok(uid)
}

fn provision_realm<S: CardSession>(session: &mut S, material: &RealmMaterial) -> Result<()> {
    let factory_key = AesKey::default();

    session.select_application(Aid::MASTER)?;
    session.authenticate(MASTER_KEY_SLOT, &factory_key)?;
    session.create_application(material.aid, INITIAL_APP_SETTINGS, APP_KEYS)?;

    session.select_application(material.aid)?;
    session.authenticate(MASTER_KEY_SLOT, &factory_key)?;

    debug!(aid = %material.aid, "rotating transport keys");
    session.change_key(READ_KEY_SLOT, &material.read_key, &factory_key)?;
    session.change_key(AUTH_KEY_SLOT, &material.auth_key, &factory_key)?;
    session.change_key(UPDATE_KEY_SLOT, &material.update_key, &factory_key)?;

    debug!(aid = %material.aid, "writing identifier file");
    let mut identifier_file = CreatedFile::create(
        session,
        IDENTIFIER_FILE,
        CommMode::Plain,
        INITIAL_IDENTIFIER_RIGHTS,
        ASSOCIATION_ID_LEN as u32,
    )?;
    identifier_file.write_exact(0, &material.identifier)?;
    identifier_file.seal(CommMode::Enciphered, FINAL_IDENTIFIER_RIGHTS)?;

    debug!(aid = %material.aid, "writing authenticity file");
    let mut authenticity_file = CreatedFile::create(
        session,
        AUTHENTICITY_FILE,
        CommMode::Enciphered,
        AUTHENTICITY_RIGHTS,
        AuthenticityRecord::LEN as u32,
    )?;
    authenticity_file.write_exact(0, material.record.r())?;
    authenticity_file.write_exact(COMPONENT_LEN as u32, material.record.s())?;

    debug!(aid = %material.aid, "locking application");
    session.change_key(MASTER_KEY_SLOT, &material.master_key, &factory_key)?;
    session.authenticate(MASTER_KEY_SLOT, &material.master_key)?;
    session.change_key_settings(FINAL_APP_SETTINGS)?;

    Ok(())
}

fn finalize_picc<S: CardSession>(session: &mut S, picc_key: &AesKey) -> Result<()> {
    let factory_key = AesKey::default();

    debug!("locking down card");
    session.select_application(Aid::MASTER)?;
    session.authenticate(MASTER_KEY_SLOT, &factory_key)?;
    session.change_key_settings(INITIAL_PICC_SETTINGS)?;
    session.change_key(MASTER_KEY_SLOT, picc_key, &factory_key)?;
    session.authenticate(MASTER_KEY_SLOT, picc_key)?;
    session.change_key_settings(FINAL_PICC_SETTINGS)?;
    session.set_configuration(CardConfig {
        disable_format: false,
        random_uid: true,
    })?;

    Ok(())
}

/// Reset an interrupted provisioning pass to a clean, re-issuable state.
///
/// Because [`issue`] rotates the PICC master key last, an interrupted
/// pass always leaves one of exactly two keys on the PICC: the factory
/// default or the card-specific derived key. This tries both, formats
/// the card, and restores the factory key.
///
/// A fully issued card has random-uid mode active, so the uid this
/// session reports is not the one its keys were derived from; such a
/// card cannot be recovered without its recorded physical uid.
pub fn recover<S: CardSession>(session: &mut S, system_secret: &[u8]) -> Result<Uid> {
    let uid = session.uid()?;
    let factory_key = AesKey::default();
    let derived_key = derive_key(
        system_secret,
        Aid::MASTER,
        MASTER_KEY_SLOT,
        uid.hex().as_bytes(),
    );

    session.select_application(Aid::MASTER)?;
    let active_key = if session.authenticate(MASTER_KEY_SLOT, &factory_key).is_ok() {
        debug!(%uid, "card carries the factory master key");
        factory_key.clone()
    } else if session.authenticate(MASTER_KEY_SLOT, &derived_key).is_ok() {
        debug!(%uid, "card carries the derived master key");
        derived_key
    } else {
        warn!(%uid, "card master key matches neither candidate");
        return Err(Error::Unrecoverable);
    };

    session.format_picc()?;
    if active_key != factory_key {
        session.change_key(MASTER_KEY_SLOT, &factory_key, &active_key)?;
        session.authenticate(MASTER_KEY_SLOT, &factory_key)?;
    }

    info!(%uid, "card recovered to factory-keyed blank state");
    Ok(uid)
}
