use crate::{AccessRights, AesKey, Aid, CardConfig, CardError, CommMode, KeyConfig, Uid};

/// The operation set of a connected card.
///
/// This is the sole boundary between the provisioning/authentication
/// protocols and chip-specific transport concerns. A session is
/// single-owner and strictly sequential: every operation depends on the
/// card state left behind by the previous one (selected application,
/// authenticated key slot), which is why all methods take `&mut self`.
///
/// Implementations must report every chip-level failure as a
/// [`CardError`]; the protocols treat any error as fatal to the current
/// pass and never retry individual operations.
pub trait CardSession {
    /// The card's physical unique identifier.
    fn uid(&mut self) -> Result<Uid, CardError>;

    /// Select the application to operate on ([`Aid::MASTER`] for
    /// PICC-level operations). Drops any active authentication.
    fn select_application(&mut self, aid: Aid) -> Result<(), CardError>;

    /// Authenticate against a key slot of the selected application.
    fn authenticate(&mut self, key_slot: u8, key: &AesKey) -> Result<(), CardError>;

    /// Create an application with the given initial key settings and
    /// key configuration. Requires the master application.
    fn create_application(
        &mut self,
        aid: Aid,
        settings: u8,
        keys: KeyConfig,
    ) -> Result<(), CardError>;

    /// Replace the key in `key_slot` with `new_key`. `current_key` is
    /// the key presently stored in that slot, required by the chip's
    /// key-change cryptogram when rotating a slot other than the one
    /// authenticated with.
    fn change_key(
        &mut self,
        key_slot: u8,
        new_key: &AesKey,
        current_key: &AesKey,
    ) -> Result<(), CardError>;

    /// Change the key settings of the selected application (or of the
    /// PICC when the master application is selected).
    fn change_key_settings(&mut self, settings: u8) -> Result<(), CardError>;

    /// Create a standard data file of `size` bytes in the selected
    /// application.
    fn create_data_file(
        &mut self,
        file: u8,
        comm: CommMode,
        rights: AccessRights,
        size: u32,
    ) -> Result<(), CardError>;

    /// Change the communication mode and access rights of an existing file.
    fn change_file_settings(
        &mut self,
        file: u8,
        comm: CommMode,
        rights: AccessRights,
    ) -> Result<(), CardError>;

    /// Write `data` to the file at `offset`, returning the number of
    /// bytes the card accepted.
    fn write_data(&mut self, file: u8, offset: u32, data: &[u8]) -> Result<usize, CardError>;

    /// Read into `buf` from the file at `offset`, returning the number
    /// of bytes the card produced.
    fn read_data(&mut self, file: u8, offset: u32, buf: &mut [u8]) -> Result<usize, CardError>;

    /// Apply PICC-level configuration flags. Requires authentication
    /// with the PICC master key.
    fn set_configuration(&mut self, config: CardConfig) -> Result<(), CardError>;

    /// Erase all applications and files, returning the card to a blank
    /// (but not re-keyed) state. Requires authentication with the PICC
    /// master key. Used by the recovery path.
    fn format_picc(&mut self) -> Result<(), CardError>;

    /// Release the card.
    fn disconnect(&mut self) -> Result<(), CardError>;
}
