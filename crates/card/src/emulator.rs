//! In-memory card emulator.
//!
//! Implements [`CardSession`] against a software model of a DESFire-like
//! card: a PICC-level master application plus per-realm applications,
//! each with its own key slots, data files and access rights. Used by
//! the protocol test suites and the CLI's exercise mode.
//!
//! The model enforces what the protocols depend on: key equality on
//! `authenticate` and `change_key`, application and file existence,
//! file bounds, and the read/write access-right nibbles. Two deliberate
//! simplifications: a session authenticated with the application master
//! key may read and write files regardless of nibbles (the provisioning
//! pass writes the authenticity file under the master session), and
//! key-settings bytes are stored verbatim without interpreting their
//! bit meanings.

use std::collections::BTreeMap;

use rand::RngCore;

use crate::{
    AccessRights, AesKey, Aid, CardConfig, CardError, CardSession, CommMode, KeyConfig, Uid,
};

/// Key slot that must be authenticated for administrative operations.
const MASTER_KEY_SLOT: u8 = 0;

/// Factory-default PICC key settings byte.
const FACTORY_PICC_SETTINGS: u8 = 0x0F;

#[derive(Debug, Clone)]
struct File {
    comm: CommMode,
    rights: AccessRights,
    data: Vec<u8>,
}

#[derive(Debug, Clone)]
struct Application {
    settings: u8,
    keys: Vec<AesKey>,
    files: BTreeMap<u8, File>,
}

impl Application {
    fn new(settings: u8, key_count: u8) -> Self {
        Self {
            settings,
            keys: vec![AesKey::default(); key_count as usize],
            files: BTreeMap::new(),
        }
    }
}

/// A software card.
#[derive(Debug)]
pub struct CardEmulator {
    uid: Uid,
    config: CardConfig,
    picc: Application,
    apps: BTreeMap<u32, Application>,
    selected: Aid,
    authenticated: Option<u8>,
}

impl CardEmulator {
    /// Create a factory-fresh card with the given physical uid.
    pub fn new(uid: [u8; 7]) -> Self {
        Self {
            uid: Uid::new(uid),
            config: CardConfig::default(),
            picc: Application::new(FACTORY_PICC_SETTINGS, 1),
            apps: BTreeMap::new(),
            selected: Aid::MASTER,
            authenticated: None,
        }
    }

    /// The current PICC master key.
    pub fn picc_key(&self) -> &AesKey {
        &self.picc.keys[MASTER_KEY_SLOT as usize]
    }

    /// Whether an application exists on the card.
    pub fn has_application(&self, aid: Aid) -> bool {
        self.apps.contains_key(&aid.to_u32())
    }

    /// The key currently stored in an application's key slot.
    pub fn application_key(&self, aid: Aid, key_slot: u8) -> Option<&AesKey> {
        self.apps.get(&aid.to_u32())?.keys.get(key_slot as usize)
    }

    /// The contents of a file, bypassing access rights (inspection only).
    pub fn file_data(&self, aid: Aid, file: u8) -> Option<&[u8]> {
        Some(&self.apps.get(&aid.to_u32())?.files.get(&file)?.data)
    }

    /// A file's communication mode and access rights.
    pub fn file_settings(&self, aid: Aid, file: u8) -> Option<(CommMode, AccessRights)> {
        let file = self.apps.get(&aid.to_u32())?.files.get(&file)?;
        Some((file.comm, file.rights))
    }

    /// Whether random-uid mode has been enabled.
    pub const fn random_uid_enabled(&self) -> bool {
        self.config.random_uid
    }

    fn selected_app(&mut self) -> &mut Application {
        if self.selected == Aid::MASTER {
            &mut self.picc
        } else {
            // Selection is validated in select_application.
            self.apps
                .get_mut(&self.selected.to_u32())
                .expect("selected application exists")
        }
    }

    fn require_master_auth(&self) -> Result<(), CardError> {
        if self.authenticated == Some(MASTER_KEY_SLOT) {
            Ok(())
        } else {
            Err(CardError::NotPermitted)
        }
    }

    /// Whether the authenticated key slot satisfies one of the given
    /// access nibbles. The application master key always qualifies.
    fn access_allowed(&self, nibbles: [u8; 2]) -> bool {
        if nibbles.contains(&AccessRights::FREE) {
            return true;
        }
        match self.authenticated {
            Some(slot) => slot == MASTER_KEY_SLOT || nibbles.contains(&slot),
            None => false,
        }
    }
}

impl CardSession for CardEmulator {
    fn uid(&mut self) -> Result<Uid, CardError> {
        if self.config.random_uid {
            // The chip answers with a fresh random id once random-uid
            // mode is on; the real uid is no longer exposed.
            let mut random = [0u8; 7];
            rand::rngs::OsRng.fill_bytes(&mut random);
            return Ok(Uid::new(random));
        }
        Ok(self.uid)
    }

    fn select_application(&mut self, aid: Aid) -> Result<(), CardError> {
        if aid != Aid::MASTER && !self.apps.contains_key(&aid.to_u32()) {
            return Err(CardError::ApplicationNotFound(aid));
        }
        self.selected = aid;
        self.authenticated = None;
        Ok(())
    }

    fn authenticate(&mut self, key_slot: u8, key: &AesKey) -> Result<(), CardError> {
        let app = self.selected_app();
        let stored = app
            .keys
            .get(key_slot as usize)
            .ok_or(CardError::NotPermitted)?;
        if stored != key {
            self.authenticated = None;
            return Err(CardError::AuthenticationRejected { slot: key_slot });
        }
        self.authenticated = Some(key_slot);
        Ok(())
    }

    fn create_application(
        &mut self,
        aid: Aid,
        settings: u8,
        keys: KeyConfig,
    ) -> Result<(), CardError> {
        if self.selected != Aid::MASTER {
            return Err(CardError::NotPermitted);
        }
        self.require_master_auth()?;
        if keys.key_count == 0 || keys.key_count > 14 {
            return Err(CardError::NotPermitted);
        }
        if self.apps.contains_key(&aid.to_u32()) {
            return Err(CardError::DuplicateApplication(aid));
        }
        self.apps
            .insert(aid.to_u32(), Application::new(settings, keys.key_count));
        Ok(())
    }

    fn change_key(
        &mut self,
        key_slot: u8,
        new_key: &AesKey,
        current_key: &AesKey,
    ) -> Result<(), CardError> {
        self.require_master_auth()?;
        let authenticated = self.authenticated;
        let app = self.selected_app();
        let stored = app
            .keys
            .get_mut(key_slot as usize)
            .ok_or(CardError::NotPermitted)?;
        // The chip's key-change cryptogram proves knowledge of the key
        // being replaced.
        if stored != current_key {
            return Err(CardError::AuthenticationRejected { slot: key_slot });
        }
        *stored = new_key.clone();
        // Replacing the key of the authenticated slot ends the session.
        if authenticated == Some(key_slot) {
            self.authenticated = None;
        }
        Ok(())
    }

    fn change_key_settings(&mut self, settings: u8) -> Result<(), CardError> {
        self.require_master_auth()?;
        self.selected_app().settings = settings;
        Ok(())
    }

    fn create_data_file(
        &mut self,
        file: u8,
        comm: CommMode,
        rights: AccessRights,
        size: u32,
    ) -> Result<(), CardError> {
        if self.selected == Aid::MASTER {
            // The PICC holds no standard data files.
            return Err(CardError::NotPermitted);
        }
        self.require_master_auth()?;
        let app = self.selected_app();
        if app.files.contains_key(&file) {
            return Err(CardError::DuplicateFile(file));
        }
        app.files.insert(
            file,
            File {
                comm,
                rights,
                data: vec![0u8; size as usize],
            },
        );
        Ok(())
    }

    fn change_file_settings(
        &mut self,
        file: u8,
        comm: CommMode,
        rights: AccessRights,
    ) -> Result<(), CardError> {
        let authenticated = self.authenticated;
        let app = self.selected_app();
        let entry = app.files.get_mut(&file).ok_or(CardError::FileNotFound(file))?;
        let change = entry.rights.change();
        let permitted = change == AccessRights::FREE
            || authenticated == Some(MASTER_KEY_SLOT)
            || authenticated == Some(change);
        if !permitted {
            return Err(CardError::NotPermitted);
        }
        entry.comm = comm;
        entry.rights = rights;
        Ok(())
    }

    fn write_data(&mut self, file: u8, offset: u32, data: &[u8]) -> Result<usize, CardError> {
        let rights = self
            .selected_app()
            .files
            .get(&file)
            .ok_or(CardError::FileNotFound(file))?
            .rights;
        if !self.access_allowed([rights.write(), rights.read_write()]) {
            return Err(CardError::NotPermitted);
        }
        let entry = self.selected_app().files.get_mut(&file).expect("checked");
        let end = offset as usize + data.len();
        if end > entry.data.len() {
            return Err(CardError::OutOfBounds {
                file,
                offset,
                len: data.len(),
                size: entry.data.len() as u32,
            });
        }
        entry.data[offset as usize..end].copy_from_slice(data);
        Ok(data.len())
    }

    fn read_data(&mut self, file: u8, offset: u32, buf: &mut [u8]) -> Result<usize, CardError> {
        let rights = self
            .selected_app()
            .files
            .get(&file)
            .ok_or(CardError::FileNotFound(file))?
            .rights;
        if !self.access_allowed([rights.read(), rights.read_write()]) {
            return Err(CardError::NotPermitted);
        }
        let entry = self.selected_app().files.get(&file).expect("checked");
        let size = entry.data.len();
        if offset as usize > size {
            return Err(CardError::OutOfBounds {
                file,
                offset,
                len: buf.len(),
                size: size as u32,
            });
        }
        let n = buf.len().min(size - offset as usize);
        buf[..n].copy_from_slice(&entry.data[offset as usize..offset as usize + n]);
        Ok(n)
    }

    fn set_configuration(&mut self, config: CardConfig) -> Result<(), CardError> {
        if self.selected != Aid::MASTER {
            return Err(CardError::NotPermitted);
        }
        self.require_master_auth()?;
        self.config.disable_format |= config.disable_format;
        self.config.random_uid |= config.random_uid;
        Ok(())
    }

    fn format_picc(&mut self) -> Result<(), CardError> {
        if self.selected != Aid::MASTER || self.config.disable_format {
            return Err(CardError::NotPermitted);
        }
        self.require_master_auth()?;
        self.apps.clear();
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), CardError> {
        self.selected = Aid::MASTER;
        self.authenticated = None;
        Ok(())
    }
}
