//! Credential secrets and their typed views
//!
//! Secrets are opaque byte maps owned outside the controller. The reconciler
//! reads them once per invocation and never writes them back.

use crate::error::SecretError;
use crate::ids::{ObjectKey, ObjectMeta};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Namespaced key/value credential blob
///
/// `data` values are base64 encoded on the wire.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Secret {
    pub metadata: ObjectMeta,

    #[serde(default, with = "base64_map")]
    pub data: BTreeMap<String, Vec<u8>>,
}

impl Secret {
    pub fn new(metadata: ObjectMeta) -> Self {
        Self {
            metadata,
            data: BTreeMap::new(),
        }
    }

    /// Build a secret from plain string values
    pub fn from_string_data<K, V>(
        metadata: ObjectMeta,
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let data = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into().into_bytes()))
            .collect();
        Self { metadata, data }
    }

    pub fn key(&self) -> ObjectKey {
        self.metadata.key()
    }

    /// Read a required value as UTF-8
    pub fn string(&self, key: &str) -> Result<String, SecretError> {
        let bytes = self.data.get(key).ok_or_else(|| SecretError::MissingKey {
            secret: self.key().to_string(),
            key: key.to_string(),
        })?;

        String::from_utf8(bytes.clone()).map_err(|_| SecretError::InvalidUtf8 {
            secret: self.key().to_string(),
            key: key.to_string(),
        })
    }
}

// Values never leave the process through logs.
impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("metadata", &self.metadata)
            .field("keys", &self.data.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Card details read from a payment secret
#[derive(Clone, PartialEq, Eq)]
pub struct PaymentCard {
    pub card_number: String,
    pub card_expiry: String,
    pub card_cvv: String,
}

impl PaymentCard {
    pub const CARD_NUMBER: &'static str = "cardNumber";
    pub const CARD_EXPIRY: &'static str = "cardExpiry";
    pub const CARD_CVV: &'static str = "cardCvv";

    pub fn from_secret(secret: &Secret) -> Result<Self, SecretError> {
        Ok(Self {
            card_number: secret.string(Self::CARD_NUMBER)?,
            card_expiry: secret.string(Self::CARD_EXPIRY)?,
            card_cvv: secret.string(Self::CARD_CVV)?,
        })
    }
}

impl fmt::Debug for PaymentCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentCard")
            .field("card_number", &"<redacted>")
            .field("card_expiry", &"<redacted>")
            .field("card_cvv", &"<redacted>")
            .finish()
    }
}

/// Delivery address read from an address secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

impl DeliveryAddress {
    pub fn from_secret(secret: &Secret) -> Result<Self, SecretError> {
        Ok(Self {
            street: secret.string("street")?,
            city: secret.string("city")?,
            state: secret.string("state")?,
            zip: secret.string("zip")?,
        })
    }
}

impl fmt::Display for DeliveryAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {} {}", self.street, self.city, self.state, self.zip)
    }
}

mod base64_map {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S>(data: &BTreeMap<String, Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let encoded: BTreeMap<&String, String> =
            data.iter().map(|(k, v)| (k, STANDARD.encode(v))).collect();
        encoded.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = BTreeMap::<String, String>::deserialize(deserializer)?;
        encoded
            .into_iter()
            .map(|(k, v)| {
                STANDARD
                    .decode(v.as_bytes())
                    .map(|bytes| (k, bytes))
                    .map_err(serde::de::Error::custom)
            })
            .collect()
    }
}
