use gatehouse_card::{CardError, InvalidSlot};

/// Result alias used throughout this crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Broad classification of an [`Error`], for callers that branch on
/// whether to reject the request, retry the card, or raise an alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller's input was malformed. Retrying without changing the
    /// request cannot succeed.
    Input,
    /// The card (or its transport) misbehaved. The request may succeed
    /// against another card, or this card after recovery.
    Card,
    /// Data read back from a card failed a cryptographic or structural
    /// check. The card is not trustworthy for the checked realm.
    Integrity,
}

/// Errors produced by provisioning and verification.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An association identifier was not a well-formed UUID.
    #[error("invalid association id {0:?}")]
    InvalidAssociationId(String),

    /// A realm slot was out of range.
    #[error(transparent)]
    InvalidSlot(#[from] InvalidSlot),

    /// Two realms in one request claimed the same slot.
    #[error("realms {first:?} and {second:?} both use slot {slot}")]
    DuplicateSlot {
        /// Name of the realm that claimed the slot first.
        first: String,
        /// Name of the realm that claimed it again.
        second: String,
        /// The contested slot number.
        slot: u8,
    },

    /// A hex-encoded secret failed to decode.
    #[error("invalid {field} for realm {realm:?}")]
    SecretHex {
        /// Which secret field was malformed.
        field: &'static str,
        /// The realm the field belongs to, or the request itself.
        realm: String,
        /// Decoding failure detail.
        #[source]
        source: hex::FromHexError,
    },

    /// A secret decoded to zero bytes.
    #[error("empty {field} for realm {realm:?}")]
    EmptySecret {
        /// Which secret field was empty.
        field: &'static str,
        /// The realm the field belongs to, or the request itself.
        realm: String,
    },

    /// A private key PEM block could not be parsed as a P-384 SEC1 key.
    #[error("invalid private key: {0}")]
    PrivateKeyPem(String),

    /// A public key PEM block could not be parsed as a P-384 SPKI key.
    #[error("invalid public key: {0}")]
    PublicKeyPem(String),

    /// A realm's private and public keys do not belong together.
    #[error("key pair mismatch for realm {0:?}")]
    KeyPairMismatch(String),

    /// The card rejected or failed an operation.
    #[error(transparent)]
    Card(#[from] CardError),

    /// A write reported fewer bytes than requested.
    #[error("short write to file {file}: wrote {actual} of {expected} bytes")]
    ShortWrite {
        /// File number within the selected application.
        file: u8,
        /// Bytes requested.
        expected: usize,
        /// Bytes the card accepted.
        actual: usize,
    },

    /// A read returned fewer bytes than the stored record requires.
    #[error("short read from file {file}: got {actual} of {expected} bytes")]
    ShortRead {
        /// File number within the selected application.
        file: u8,
        /// Bytes required.
        expected: usize,
        /// Bytes returned.
        actual: usize,
    },

    /// A signature component had the wrong length.
    #[error("signature component is {actual} bytes, expected {expected}", expected = crate::sig::COMPONENT_LEN)]
    ComponentLength {
        /// Real length of the offending component.
        actual: usize,
    },

    /// The signing operation itself failed.
    #[error("signing failed")]
    Signing(#[source] p384::ecdsa::Error),

    /// The identifier file's contents are not a well-formed identifier.
    #[error("card identifier file is corrupt: {0:?}")]
    IdentifierCorrupt(String),

    /// The identifier stored on the card is not the expected one.
    #[error("card carries association id {actual:?}, expected {expected:?}")]
    IdentifierMismatch {
        /// Identifier the verifier expected, canonical form.
        expected: String,
        /// Identifier read from the card, lossy-decoded.
        actual: String,
    },

    /// The authenticity record did not verify under the realm's key.
    #[error("authenticity record rejected for association id {0:?}")]
    AuthenticityInvalid(String),

    /// Neither the derived master key nor the factory default key
    /// authenticated during recovery.
    #[error("card master key matches neither derived nor factory key")]
    Unrecoverable,
}

impl Error {
    /// Classify this error for coarse-grained handling.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidAssociationId(_)
            | Error::InvalidSlot(_)
            | Error::DuplicateSlot { .. }
            | Error::SecretHex { .. }
            | Error::EmptySecret { .. }
            | Error::PrivateKeyPem(_)
            | Error::PublicKeyPem(_)
            | Error::KeyPairMismatch(_) => ErrorKind::Input,
            Error::Card(_) | Error::ShortWrite { .. } | Error::Unrecoverable => ErrorKind::Card,
            Error::ShortRead { .. }
            | Error::ComponentLength { .. }
            | Error::Signing(_)
            | Error::IdentifierCorrupt(_)
            | Error::IdentifierMismatch { .. }
            | Error::AuthenticityInvalid(_) => ErrorKind::Integrity,
        }
    }
}
