//! Diversified key derivation.
//!
//! Every symmetric key written to a card is derived from a root secret
//! and structured context: the 3-byte application id, the key slot
//! number, and a per-card diversifier (the card uid's hex form for
//! master keys, the association identifier's canonical form for
//! transport keys). Identical inputs always yield identical keys, so a
//! verifier can re-derive what an issuer wrote without any shared state
//! beyond the secret.

use gatehouse_card::{AesKey, Aid};
use hmac::{Hmac, Mac};
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

/// Derive a diversified 128-bit card key.
///
/// Computes HMAC-SHA-512 over the secret, feeding the MAC three
/// segments in order: the application id bytes (wire order), the key
/// slot number, and the diversifier. The key is the first 16 bytes of
/// the MAC output.
///
/// The segment order and byte forms are frozen: every key on every
/// issued card was derived this way, and changing any of them changes
/// every derived key.
pub fn derive_key(secret: &[u8], aid: Aid, key_slot: u8, diversifier: &[u8]) -> AesKey {
    // HMAC accepts keys of any length; this cannot fail for a byte slice.
    let mut mac = HmacSha512::new_from_slice(secret).expect("HMAC key of any length");
    mac.update(aid.as_bytes());
    mac.update(&[key_slot]);
    mac.update(diversifier);
    AesKey::from_material(&mac.finalize().into_bytes())
}
