//! The realm model: one access domain, one card application.

use core::fmt;

use gatehouse_card::{AesKey, Aid, Slot};
use p384::{PublicKey, SecretKey};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::{Error, Result};

/// Key slot holding an application's (or the PICC's) master key.
pub const MASTER_KEY_SLOT: u8 = 0;
/// Key slot holding the realm's static read key.
pub const READ_KEY_SLOT: u8 = 1;
/// Key slot holding the diversified authentication key.
pub const AUTH_KEY_SLOT: u8 = 2;
/// Key slot holding the diversified update key.
pub const UPDATE_KEY_SLOT: u8 = 3;

/// On-card width of the association identifier: the UUID's dashless
/// lowercase-hex ASCII form.
pub const ASSOCIATION_ID_LEN: usize = 32;

/// One access domain, mapped onto one application slot on every card
/// issued for it.
///
/// Secrets are raw bytes, zeroized on drop. The read secret becomes the
/// static read key directly; the auth and update secrets are derivation
/// roots, never written to a card themselves.
#[derive(Clone)]
pub struct Realm {
    /// Human-readable realm name, used only for logs and error messages.
    pub name: String,
    /// Application slot this realm occupies on issued cards.
    pub slot: Slot,
    /// Identifier tying issued cards to an external association record.
    pub association_id: Uuid,
    /// Root for re-deriving the slot-2 authentication key at
    /// verification time.
    pub auth_secret: Zeroizing<Vec<u8>>,
    /// Static secret shared with the realm's readers; becomes key
    /// slot 1 as-is.
    pub read_secret: Zeroizing<Vec<u8>>,
    /// Root reserved for the slot-3 update key.
    pub update_secret: Zeroizing<Vec<u8>>,
    /// Signing half of the realm's ECDSA key pair.
    pub private_key: SecretKey,
    /// Verifying half of the realm's ECDSA key pair.
    pub public_key: PublicKey,
}

impl Realm {
    /// The application id this realm occupies.
    pub fn aid(&self) -> Aid {
        Aid::for_slot(self.slot)
    }

    /// The static read key, built from the read secret by truncation or
    /// zero-padding to the cipher key size. Deliberately not
    /// diversified per card.
    pub fn read_key(&self) -> AesKey {
        AesKey::from_material(&self.read_secret)
    }

    /// Canonical string form of the association id (lowercase,
    /// hyphenated). This is the message the authenticity record signs.
    pub fn canonical_id(&self) -> String {
        self.association_id.to_string()
    }
}

impl fmt::Debug for Realm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Realm")
            .field("name", &self.name)
            .field("slot", &self.slot)
            .field("association_id", &self.association_id)
            .finish_non_exhaustive()
    }
}

/// Encode an association id into its fixed-width on-card form: 32 bytes
/// of dashless lowercase hex ASCII.
pub fn encode_association_id(id: &Uuid) -> [u8; ASSOCIATION_ID_LEN] {
    let mut buf = [0u8; ASSOCIATION_ID_LEN];
    id.simple().encode_lower(&mut buf);
    buf
}

/// Decode an association id from its on-card form.
///
/// The input must be exactly [`ASSOCIATION_ID_LEN`] bytes of dashless
/// hex; anything else (including the hyphenated form) is rejected.
pub fn decode_association_id(bytes: &[u8]) -> Result<Uuid> {
    if bytes.len() != ASSOCIATION_ID_LEN {
        return Err(Error::InvalidAssociationId(
            String::from_utf8_lossy(bytes).into_owned(),
        ));
    }
    Uuid::try_parse_ascii(bytes)
        .map_err(|_| Error::InvalidAssociationId(String::from_utf8_lossy(bytes).into_owned()))
}
