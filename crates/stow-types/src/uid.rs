use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use stow_codec::{Schema, SerdeError, SerdeResult, Serializable};
use uuid::Uuid;

/// Mersenne prime 2^61 - 1, modulus of [`Uid::stable_hash`].
const STABLE_HASH_MODULUS: u128 = (1 << 61) - 1;

/// Wire schema of [`Uid`].
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UidSchema {
    /// Discriminator slot; left empty for identifiers.
    #[prost(string, tag = "1")]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub obj_type: ::prost::alloc::string::String,
    /// The 16 raw bytes, big-endian.
    #[prost(bytes = "vec", tag = "2")]
    #[serde(with = "stow_codec::base64_bytes")]
    pub value: ::prost::alloc::vec::Vec<u8>,
}

impl Schema for UidSchema {
    const FULL_NAME: &'static str = "stow.types.UidSchema";
}

/// Opaque 128-bit unique identifier.
///
/// Equality, ordering and hashing are defined over the 16-byte value only.
/// Renders as `<UID:xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx>`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Uid(Uuid);

impl Uid {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Identifier with the given 128-bit value.
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    /// Identifier from 16 big-endian bytes.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Wrap an existing UUID.
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse from a raw byte slice, which must be exactly 16 bytes.
    pub fn try_from_slice(bytes: &[u8]) -> SerdeResult<Self> {
        let arr: [u8; 16] = bytes.try_into().map_err(|_| {
            SerdeError::Decode(format!("uid must be 16 bytes, got {}", bytes.len()))
        })?;
        Ok(Self::from_bytes(arr))
    }

    /// The value as a 128-bit integer.
    pub fn value(&self) -> u128 {
        self.0.as_u128()
    }

    /// The raw 16 bytes, big-endian.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Process-independent hash of the value.
    ///
    /// The integer value reduced modulo 2^61 - 1, so the same identifier
    /// hashes identically across runs and platforms.
    pub fn stable_hash(&self) -> u64 {
        (self.value() % STABLE_HASH_MODULUS) as u64
    }
}

impl Default for Uid {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<UID:{}>", self.0.hyphenated())
    }
}

impl fmt::Debug for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Uid {
    type Err = SerdeError;

    /// Accepts `<UID:...>` or a bare UUID string.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s
            .strip_prefix("<UID:")
            .and_then(|rest| rest.strip_suffix('>'))
            .unwrap_or(s);
        Uuid::parse_str(inner)
            .map(Self)
            .map_err(|e| SerdeError::Decode(format!("invalid uid {s:?}: {e}")))
    }
}

impl From<Uuid> for Uid {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<u128> for Uid {
    fn from(value: u128) -> Self {
        Self::from_u128(value)
    }
}

impl Serializable for Uid {
    type Schema = UidSchema;
    const QUALIFIED_NAME: &'static str = "stow.types.Uid";

    fn to_native(&self) -> SerdeResult<UidSchema> {
        Ok(UidSchema {
            obj_type: String::new(),
            value: self.as_bytes().to_vec(),
        })
    }

    fn from_native(schema: UidSchema) -> SerdeResult<Self> {
        Self::try_from_slice(&schema.value)
    }
}
