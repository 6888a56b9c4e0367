use std::fmt;

use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// AES-128 key length in bytes; every card key slot holds a key of this size.
pub const AES_KEY_LEN: usize = 16;

/// A 128-bit symmetric card key.
///
/// Key material is wiped on drop. The all-zero key (`AesKey::default()`)
/// is the factory default for uninitialised cards and freshly created
/// applications.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct AesKey([u8; AES_KEY_LEN]);

impl AesKey {
    /// Wrap exactly 16 bytes of key material.
    pub const fn new(bytes: [u8; AES_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Build a key from raw material, taking at most the first 16 bytes
    /// and zero-padding anything shorter.
    ///
    /// Realm secrets are length-bounded to the cipher's key size rather
    /// than required to be exactly 16 bytes; longer material (for
    /// example a full MAC output) is truncated.
    pub fn from_material(material: &[u8]) -> Self {
        let mut bytes = [0u8; AES_KEY_LEN];
        let n = material.len().min(AES_KEY_LEN);
        bytes[..n].copy_from_slice(&material[..n]);
        Self(bytes)
    }

    /// Generate a fresh random key.
    pub fn random() -> Self {
        let mut bytes = [0u8; AES_KEY_LEN];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// The raw key bytes.
    pub const fn as_bytes(&self) -> &[u8; AES_KEY_LEN] {
        &self.0
    }
}

impl Default for AesKey {
    fn default() -> Self {
        Self([0u8; AES_KEY_LEN])
    }
}

impl fmt::Debug for AesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never log key material.
        f.write_str("AesKey(..)")
    }
}

/// The 7-byte physical unique identifier of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Uid([u8; 7]);

impl Uid {
    /// Wrap a raw 7-byte uid.
    pub const fn new(bytes: [u8; 7]) -> Self {
        Self(bytes)
    }

    /// The raw uid bytes.
    pub const fn as_bytes(&self) -> &[u8; 7] {
        &self.0
    }

    /// Lowercase hex form of the uid.
    ///
    /// This is the form the key-derivation function consumes as a
    /// diversifier, so it must stay stable across releases.
    pub fn hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex())
    }
}

/// Communication mode of a data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommMode {
    /// Plaintext transfer.
    Plain = 0x00,
    /// Plaintext with an appended MAC.
    Maced = 0x01,
    /// Fully enciphered transfer.
    Enciphered = 0x03,
}

/// DESFire file access rights word.
///
/// Four nibbles, most significant first: read, write, read&write,
/// change-access-rights. Each nibble is a key number `0x0..=0xD`,
/// [`AccessRights::FREE`] (no authentication required) or
/// [`AccessRights::DENY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessRights(u16);

impl AccessRights {
    /// Nibble value granting access without authentication.
    pub const FREE: u8 = 0xE;
    /// Nibble value denying access outright.
    pub const DENY: u8 = 0xF;

    /// Wrap a raw access-rights word.
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// Compose an access-rights word from its four nibbles.
    pub const fn new(read: u8, write: u8, read_write: u8, change: u8) -> Self {
        Self(
            ((read as u16) & 0xF) << 12
                | ((write as u16) & 0xF) << 8
                | ((read_write as u16) & 0xF) << 4
                | (change as u16) & 0xF,
        )
    }

    /// The raw word.
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Key number allowed to read (or [`Self::FREE`]/[`Self::DENY`]).
    pub const fn read(self) -> u8 {
        ((self.0 >> 12) & 0xF) as u8
    }

    /// Key number allowed to write.
    pub const fn write(self) -> u8 {
        ((self.0 >> 8) & 0xF) as u8
    }

    /// Key number allowed both read and write.
    pub const fn read_write(self) -> u8 {
        ((self.0 >> 4) & 0xF) as u8
    }

    /// Key number allowed to change these rights.
    pub const fn change(self) -> u8 {
        (self.0 & 0xF) as u8
    }
}

/// Key configuration for a freshly created application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyConfig {
    /// Number of key slots in the application (1..=14).
    pub key_count: u8,
    /// Whether the application keys use the AES cipher.
    ///
    /// Encoded as the `0x80` flag in the creation command; without it
    /// the chip falls back to legacy DES/3DES keys.
    pub aes: bool,
}

impl KeyConfig {
    /// An AES-keyed application with the given number of key slots.
    pub const fn aes(key_count: u8) -> Self {
        Self {
            key_count,
            aes: true,
        }
    }

    /// The flag byte as transmitted in the application creation command.
    pub const fn flags(self) -> u8 {
        if self.aes {
            self.key_count | 0x80
        } else {
            self.key_count
        }
    }
}

/// PICC-level configuration flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CardConfig {
    /// Permanently disable the format (erase) command.
    pub disable_format: bool,
    /// Stop exposing the static uid over the air; the card answers
    /// anticollision with a fresh random id instead. Irreversible on
    /// real chips.
    pub random_uid: bool,
}
