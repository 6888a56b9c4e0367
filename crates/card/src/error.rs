use crate::Aid;

/// Errors surfaced by [`CardSession`](crate::CardSession) operations.
///
/// Any of these is fatal to the issuance or verification pass that hit
/// it; the protocols never retry a failed card operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CardError {
    /// The card stopped answering (left the field, chip busy).
    #[error("card did not respond")]
    NoResponse,

    /// The card rejected the key presented for the given key slot.
    #[error("authentication rejected for key slot {slot}")]
    AuthenticationRejected {
        /// Key slot the authentication targeted.
        slot: u8,
    },

    /// No application with this id exists on the card.
    #[error("no application {0} on card")]
    ApplicationNotFound(Aid),

    /// An application with this id already exists.
    #[error("application {0} already exists")]
    DuplicateApplication(Aid),

    /// The selected application has no such file.
    #[error("no file {0} in the selected application")]
    FileNotFound(u8),

    /// A file with this number already exists in the selected application.
    #[error("file {0} already exists")]
    DuplicateFile(u8),

    /// A read or write ran past the file's declared size.
    #[error("file {file} access out of bounds: offset {offset} + {len} exceeds size {size}")]
    OutOfBounds {
        /// File number.
        file: u8,
        /// Offset of the attempted access.
        offset: u32,
        /// Length of the attempted access.
        len: usize,
        /// Declared file size.
        size: u32,
    },

    /// The operation is not permitted in the card's current state
    /// (missing authentication, access rights, key settings).
    #[error("operation not permitted in the current card state")]
    NotPermitted,

    /// Failure in the underlying contactless transport.
    #[error("transport failure: {0}")]
    Transport(String),
}
