//! The issue/verify request document.
//!
//! Both provisioning and verification consume the same JSON shape: a
//! hex-encoded system secret plus one descriptor per realm. Decoding is
//! strictly separated from resolution: serde gets the document into
//! memory, [`IssueRequest::resolve`] then validates every field and
//! produces card-ready [`Realm`]s. Nothing touches a card until the
//! whole document has resolved.

use gatehouse_card::Slot;
use serde::Deserialize;
use zeroize::Zeroizing;

use crate::realm::Realm;
use crate::sig;
use crate::{Error, Result};

/// A provisioning or verification request, as received on the wire.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRequest {
    /// Hex-encoded root secret for card-key derivation.
    pub system_secret: String,
    /// Realms to provision or verify, in order.
    pub realms: Vec<RealmDescriptor>,
}

/// One realm entry of an [`IssueRequest`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealmDescriptor {
    /// Human-readable realm name.
    pub name: String,
    /// Application slot, 0 to 14.
    pub slot: u8,
    /// Association identifier, any UUID text form.
    pub association_id: String,
    /// Hex-encoded authentication-key derivation root.
    pub auth_key: String,
    /// Hex-encoded static read secret.
    pub read_key: String,
    /// Hex-encoded update-key derivation root.
    pub update_key: String,
    /// SPKI "PUBLIC KEY" PEM block.
    pub public_key: String,
    /// SEC1 "EC PRIVATE KEY" PEM block.
    pub private_key: String,
}

impl IssueRequest {
    /// Validate every field and produce the decoded system secret and
    /// card-ready realms.
    ///
    /// Fails on the first problem found; no partial output. Checks, per
    /// realm: slot range, slot uniqueness across the document, UUID
    /// syntax, hex syntax and non-emptiness of each secret, PEM syntax
    /// of both keys, and that the two keys form a pair.
    pub fn resolve(&self) -> Result<(Zeroizing<Vec<u8>>, Vec<Realm>)> {
        let system_secret = decode_secret(&self.system_secret, "system secret", "request")?;

        let mut realms = Vec::with_capacity(self.realms.len());
        for descriptor in &self.realms {
            let realm = descriptor.resolve()?;
            if let Some(previous) = realms
                .iter()
                .find(|existing: &&Realm| existing.slot == realm.slot)
            {
                return Err(Error::DuplicateSlot {
                    first: previous.name.clone(),
                    second: realm.name.clone(),
                    slot: realm.slot.index(),
                });
            }
            realms.push(realm);
        }

        Ok((system_secret, realms))
    }
}

impl RealmDescriptor {
    fn resolve(&self) -> Result<Realm> {
        let slot = Slot::new(self.slot)?;
        let association_id = uuid::Uuid::parse_str(&self.association_id)
            .map_err(|_| Error::InvalidAssociationId(self.association_id.clone()))?;

        let auth_secret = decode_secret(&self.auth_key, "auth key", &self.name)?;
        let read_secret = decode_secret(&self.read_key, "read key", &self.name)?;
        let update_secret = decode_secret(&self.update_key, "update key", &self.name)?;

        let private_key = sig::decode_private_key(&self.private_key)?;
        let public_key = sig::decode_public_key(&self.public_key)?;
        if private_key.public_key() != public_key {
            return Err(Error::KeyPairMismatch(self.name.clone()));
        }

        Ok(Realm {
            name: self.name.clone(),
            slot,
            association_id,
            auth_secret,
            read_secret,
            update_secret,
            private_key,
            public_key,
        })
    }
}

fn decode_secret(encoded: &str, field: &'static str, realm: &str) -> Result<Zeroizing<Vec<u8>>> {
    let bytes = hex::decode(encoded).map_err(|source| Error::SecretHex {
        field,
        realm: realm.to_owned(),
        source,
    })?;
    if bytes.is_empty() {
        return Err(Error::EmptySecret {
            field,
            realm: realm.to_owned(),
        });
    }
    Ok(Zeroizing::new(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sig::{encode_private_key, encode_public_key, generate_keypair};

    fn descriptor(name: &str, slot: u8) -> RealmDescriptor {
        let (private, public) = generate_keypair();
        RealmDescriptor {
            name: name.into(),
            slot,
            association_id: "11111111-1111-1111-1111-111111111111".into(),
            auth_key: "aa".repeat(32),
            read_key: "bb".repeat(16),
            update_key: "cc".repeat(32),
            public_key: encode_public_key(&public).unwrap(),
            private_key: encode_private_key(&private).unwrap().to_string(),
        }
    }

    fn request() -> IssueRequest {
        IssueRequest {
            system_secret: "00".repeat(32),
            realms: vec![descriptor("doors", 3)],
        }
    }

    #[test]
    fn wire_field_names_parse() {
        let (private, public) = generate_keypair();
        let doc = serde_json::json!({
            "systemSecret": "00".repeat(32),
            "realms": [{
                "name": "doors",
                "slot": 3,
                "associationId": "11111111-1111-1111-1111-111111111111",
                "authKey": "aa".repeat(32),
                "readKey": "bb".repeat(16),
                "updateKey": "cc".repeat(32),
                "publicKey": encode_public_key(&public).unwrap(),
                "privateKey": encode_private_key(&private).unwrap().to_string(),
            }],
        });
        let request: IssueRequest = serde_json::from_value(doc).unwrap();
        let (secret, realms) = request.resolve().unwrap();
        assert_eq!(secret.len(), 32);
        assert_eq!(realms.len(), 1);
        assert_eq!(realms[0].slot.index(), 3);
        assert_eq!(
            realms[0].canonical_id(),
            "11111111-1111-1111-1111-111111111111"
        );
    }

    #[test]
    fn reserved_slot_is_rejected() {
        let mut request = request();
        request.realms[0].slot = 15;
        assert!(matches!(
            request.resolve(),
            Err(Error::InvalidSlot(_))
        ));
    }

    #[test]
    fn duplicate_slots_are_rejected() {
        let mut request = request();
        request.realms.push(descriptor("machines", 3));
        match request.resolve() {
            Err(Error::DuplicateSlot { first, second, slot }) => {
                assert_eq!(first, "doors");
                assert_eq!(second, "machines");
                assert_eq!(slot, 3);
            }
            other => panic!("expected duplicate slot error, got {other:?}"),
        }
    }

    #[test]
    fn malformed_hex_is_rejected() {
        let mut request = request();
        request.realms[0].auth_key = "not hex".into();
        assert!(matches!(
            request.resolve(),
            Err(Error::SecretHex { field: "auth key", .. })
        ));

        let mut request = self::request();
        request.system_secret = "0".into();
        assert!(matches!(
            request.resolve(),
            Err(Error::SecretHex { field: "system secret", .. })
        ));
    }

    #[test]
    fn empty_secret_is_rejected() {
        let mut request = request();
        request.realms[0].read_key = String::new();
        assert!(matches!(
            request.resolve(),
            Err(Error::EmptySecret { field: "read key", .. })
        ));
    }

    #[test]
    fn malformed_uuid_is_rejected() {
        let mut request = request();
        request.realms[0].association_id = "not-a-uuid".into();
        assert!(matches!(
            request.resolve(),
            Err(Error::InvalidAssociationId(_))
        ));
    }

    #[test]
    fn mismatched_key_pair_is_rejected() {
        let mut request = request();
        let (_, foreign_public) = generate_keypair();
        request.realms[0].public_key = encode_public_key(&foreign_public).unwrap();
        assert!(matches!(
            request.resolve(),
            Err(Error::KeyPairMismatch(name)) if name == "doors"
        ));
    }

    #[test]
    fn malformed_pem_is_rejected() {
        let mut request = request();
        request.realms[0].private_key = "garbage".into();
        assert!(matches!(request.resolve(), Err(Error::PrivateKeyPem(_))));
    }
}
