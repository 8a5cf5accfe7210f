use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{SerdeError, SerdeResult};

/// Prefix placed before the schema name in [`AnyMessage::type_url`].
pub const TYPE_URL_PREFIX: &str = "type.stow.dev/";

/// A wire schema message: the native form of some serializable type.
///
/// Schemas carry two codecs: the protobuf wire format through
/// [`prost::Message`] and JSON through `serde`. By convention tag 1 of every
/// top-level schema is a `string obj_type` discriminator.
pub trait Schema:
    prost::Message + Default + Clone + PartialEq + Serialize + DeserializeOwned + 'static
{
    /// Stable, globally unique schema name.
    const FULL_NAME: &'static str;
}

/// Type-erased native form: a schema name plus the schema's encoded bytes.
///
/// A form with no bytes produced by [`TypeDescriptor::blank`] is a *blank*
/// instance; it only carries the schema name for type matching.
///
/// [`TypeDescriptor::blank`]: crate::TypeDescriptor::blank
#[derive(Clone, PartialEq, Eq)]
pub struct NativeForm {
    schema_name: String,
    bytes: Vec<u8>,
}

impl NativeForm {
    /// Encode a schema message into a native form.
    pub fn encode<M: Schema>(message: &M) -> Self {
        Self {
            schema_name: M::FULL_NAME.to_string(),
            bytes: message.encode_to_vec(),
        }
    }

    /// A blank form for the named schema.
    pub fn blank(schema_name: impl Into<String>) -> Self {
        Self {
            schema_name: schema_name.into(),
            bytes: Vec::new(),
        }
    }

    /// Build a form from a schema name and already-encoded bytes.
    pub fn from_parts(schema_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            schema_name: schema_name.into(),
            bytes,
        }
    }

    /// Decode the bytes as schema `M`.
    ///
    /// Fails with `TypeMismatch` if this form belongs to another schema and
    /// with `MalformedEnvelope` if the bytes are not a valid `M`.
    pub fn decode<M: Schema>(&self) -> SerdeResult<M> {
        if self.schema_name != M::FULL_NAME {
            return Err(SerdeError::mismatch(M::FULL_NAME, self.schema_name.as_str()));
        }
        M::decode(self.bytes.as_slice())
            .map_err(|e| SerdeError::MalformedEnvelope(format!("{}: {e}", M::FULL_NAME)))
    }

    /// Full name of the schema these bytes belong to.
    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    /// The encoded message bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the form, returning its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Returns `true` if the form carries no encoded bytes.
    pub fn is_blank(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for NativeForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeForm")
            .field("schema", &self.schema_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Container for one message nested inside another ("any" pattern).
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnyMessage {
    #[prost(string, tag = "1")]
    pub type_url: ::prost::alloc::string::String,
    #[prost(bytes = "vec", tag = "2")]
    #[serde(with = "crate::schema::base64_bytes")]
    pub value: ::prost::alloc::vec::Vec<u8>,
}

impl AnyMessage {
    /// Pack a native form, recording its schema name in the type URL.
    pub fn pack(form: &NativeForm) -> Self {
        Self {
            type_url: format!("{TYPE_URL_PREFIX}{}", form.schema_name()),
            value: form.as_bytes().to_vec(),
        }
    }

    /// The schema name after the last `/` of the type URL.
    pub fn type_name(&self) -> &str {
        match self.type_url.rsplit_once('/') {
            Some((_, name)) => name,
            None => &self.type_url,
        }
    }

    /// Returns `true` if the packed payload belongs to `blank`'s schema.
    pub fn is(&self, blank: &NativeForm) -> bool {
        self.type_name() == blank.schema_name()
    }

    /// Fill `blank` with the packed payload.
    ///
    /// The discriminator is checked before any bytes are copied; a mismatch
    /// is a `TypeMismatch`, never a zero-valued form.
    pub fn unpack(&self, blank: NativeForm) -> SerdeResult<NativeForm> {
        if !self.is(&blank) {
            return Err(SerdeError::mismatch(blank.schema_name(), self.type_name()));
        }
        Ok(NativeForm::from_parts(blank.schema_name, self.value.clone()))
    }
}

/// The tag-1 discriminator of any top-level schema.
///
/// Decoding an arbitrary schema message as this header skips every other
/// field and leaves only `obj_type`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub(crate) struct EnvelopeHeader {
    #[prost(string, tag = "1")]
    pub obj_type: ::prost::alloc::string::String,
}

impl EnvelopeHeader {
    /// Read the discriminator. An empty `obj_type` yields `None`.
    pub(crate) fn read(bytes: &[u8]) -> SerdeResult<Option<String>> {
        let header = <Self as prost::Message>::decode(bytes)
            .map_err(|e| SerdeError::MalformedEnvelope(e.to_string()))?;
        Ok(Some(header.obj_type).filter(|name| !name.is_empty()))
    }
}

/// Serde adapter encoding byte fields as padded standard base64.
pub mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        BASE64.decode(encoded.as_bytes()).map_err(de::Error::custom)
    }
}
