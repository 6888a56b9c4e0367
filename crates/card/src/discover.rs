use std::fmt;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::{CardError, CardSession};

/// Default interval between discovery polls.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Kinds of contactless tags a reader can encounter.
///
/// Only DESFire tags carry the file system and key hierarchy the
/// protocols need; everything else is reported as unsupported rather
/// than silently skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TagKind {
    /// MIFARE Classic 1K/4K.
    MifareClassic,
    /// MIFARE Ultralight / NTAG family.
    MifareUltralight,
    /// FeliCa.
    Felica,
    /// Anything the reader could not classify.
    Unknown,
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MifareClassic => "MIFARE Classic",
            Self::MifareUltralight => "MIFARE Ultralight",
            Self::Felica => "FeliCa",
            Self::Unknown => "unknown tag",
        };
        f.write_str(name)
    }
}

/// A tag found in the reader field.
#[derive(Debug)]
pub enum DiscoveredTag<S> {
    /// A DESFire tag with an open session; the only variant the
    /// protocols can operate on.
    Desfire(S),
    /// Some other tag kind; reported so the operator knows why nothing
    /// is happening.
    Unsupported(TagKind),
}

/// Source of discovered tags, implemented by reader drivers (and the
/// emulator in tests).
pub trait TagSource {
    /// Session type produced for supported tags.
    type Session: CardSession;

    /// Poll the field once. `Ok(None)` means no tag present.
    fn poll(&mut self) -> Result<Option<DiscoveredTag<Self::Session>>, CardError>;
}

/// Block until a supported card enters the field, polling at `interval`.
///
/// Unsupported tags are logged and polling continues; transport errors
/// abort the wait.
pub fn wait_for_card<T: TagSource>(
    source: &mut T,
    interval: Duration,
) -> Result<T::Session, CardError> {
    debug!("waiting for card");
    loop {
        match source.poll()? {
            Some(DiscoveredTag::Desfire(session)) => return Ok(session),
            Some(DiscoveredTag::Unsupported(kind)) => {
                warn!(%kind, "not a DESFire tag, ignoring");
            }
            None => {}
        }
        thread::sleep(interval);
    }
}
