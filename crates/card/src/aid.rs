use std::fmt;

/// Highest application slot a realm may occupy; slot 15 is reserved.
pub const MAX_SLOT: u8 = 14;

/// A realm's application slot on the card, in the range `0..=14`.
///
/// The slot selects the offset from [`Aid::BASE`] at which the realm's
/// application is created, so two realms on the same card must never
/// share a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot(u8);

impl Slot {
    /// Validate a raw slot number.
    pub const fn new(slot: u8) -> Result<Self, InvalidSlot> {
        if slot > MAX_SLOT {
            Err(InvalidSlot(slot))
        } else {
            Ok(Self(slot))
        }
    }

    /// The raw slot number.
    pub const fn index(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A slot number outside the valid `0..=14` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid realm slot {0}, must be between 0 and 14")]
pub struct InvalidSlot(pub u8);

/// A 3-byte DESFire application identifier.
///
/// Stored in wire order (least significant byte first), the order in
/// which the chip command set transmits it. The key-derivation function
/// consumes these bytes directly, so the byte order is load-bearing:
/// changing it would change every key derived for already-issued cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Aid([u8; 3]);

impl Aid {
    /// The master (PICC-level) application.
    pub const MASTER: Self = Self([0x00, 0x00, 0x00]);

    /// First application id available to realms: a MIFARE-Classic-mapped
    /// AID (`0xF....`) in the middle (`0x7F`) of an unassigned function
    /// cluster (`0xF7`), so it cannot collide with standards-assigned
    /// applications.
    pub const BASE: u32 = 0xFF77F0;

    /// Build an AID from its 24-bit numeric value.
    pub const fn from_u32(value: u32) -> Self {
        Self([
            (value & 0xFF) as u8,
            ((value >> 8) & 0xFF) as u8,
            ((value >> 16) & 0xFF) as u8,
        ])
    }

    /// The application id for a realm slot: [`Aid::BASE`]` + slot`.
    pub const fn for_slot(slot: Slot) -> Self {
        Self::from_u32(Self::BASE + slot.index() as u32)
    }

    /// The identifier bytes in wire order (LSB first).
    pub const fn as_bytes(&self) -> &[u8; 3] {
        &self.0
    }

    /// The 24-bit numeric value of this AID.
    pub const fn to_u32(self) -> u32 {
        self.0[0] as u32 | (self.0[1] as u32) << 8 | (self.0[2] as u32) << 16
    }
}

impl fmt::Display for Aid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06x}", self.to_u32())
    }
}
