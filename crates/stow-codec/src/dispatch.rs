use std::fmt;
use std::str::FromStr;

use crate::capability::{Serializable, SerializableObject};
use crate::config::CodecConfig;
use crate::envelope;
use crate::error::{SerdeError, SerdeResult};
use crate::registry::TypeRegistry;
use crate::schema::{NativeForm, Schema};

/// External representation selected for encode/decode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Format {
    /// Binary schema (protobuf wire) bytes.
    Native,
    /// Two-level JSON envelope.
    Json,
    /// Lowercase hex of the native bytes.
    Hex,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::Json => write!(f, "json"),
            Self::Hex => write!(f, "hex"),
        }
    }
}

impl FromStr for Format {
    type Err = SerdeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "native" | "binary" => Ok(Self::Native),
            "json" => Ok(Self::Json),
            "hex" => Ok(Self::Hex),
            other => Err(SerdeError::Config(format!("unknown format: {other}"))),
        }
    }
}

/// Encoded output: bytes for `native`, text for `json` and `hex`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Blob {
    Binary(Vec<u8>),
    Text(String),
}

impl Blob {
    /// The text, if this blob is textual.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Binary(_) => None,
        }
    }

    /// The raw bytes; text is returned as its UTF-8 encoding.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Binary(b) => b,
            Self::Text(s) => s.into_bytes(),
        }
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.as_ref().len()
    }

    /// Returns `true` if the blob holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AsRef<[u8]> for Blob {
    fn as_ref(&self) -> &[u8] {
        match self {
            Self::Binary(b) => b,
            Self::Text(s) => s.as_bytes(),
        }
    }
}

/// Encode/decode entry points.
///
/// Type resolution goes through [`TypeRegistry::global`].
#[derive(Clone, Debug, Default)]
pub struct Codec {
    config: CodecConfig,
}

impl Codec {
    /// Create a codec with `config`.
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Encode `obj` in `format`.
    pub fn serialize<T>(&self, obj: &T, format: Format) -> SerdeResult<Blob>
    where
        T: SerializableObject + ?Sized,
    {
        tracing::trace!(obj_type = obj.qualified_name(), %format, "serialize");
        match format {
            Format::Native => Ok(Blob::Binary(self.native_bytes(obj)?)),
            Format::Hex => Ok(Blob::Text(envelope::encode_hex(&self.native_bytes(obj)?))),
            Format::Json => {
                let style = self.config.json_style;
                let content = obj.to_json_content(style)?;
                let text = envelope::encode_json(obj.qualified_name(), content, style)?;
                envelope::check_encoded_size(text.len(), &self.config)?;
                Ok(Blob::Text(text))
            }
        }
    }

    /// Decode without an expected type, resolving it through the registry.
    ///
    /// Native and hex blobs must carry a tag-1 `obj_type` discriminator.
    pub fn deserialize(
        &self,
        blob: impl AsRef<[u8]>,
        format: Format,
    ) -> SerdeResult<Box<dyn SerializableObject>> {
        let blob = blob.as_ref();
        envelope::check_decoded_size(blob.len(), &self.config)?;
        let registry = TypeRegistry::global();
        match format {
            Format::Json => {
                let envelope = envelope::decode_json(text(blob)?)?;
                tracing::trace!(obj_type = %envelope.obj_type, %format, "deserialize");
                envelope.check_content_discriminator()?;
                registry
                    .lookup(&envelope.obj_type)?
                    .decode_json(&envelope.content)
            }
            Format::Native | Format::Hex => {
                let bytes = self.binary_input(blob, format)?;
                let obj_type = envelope::read_discriminator(&bytes)?.ok_or_else(|| {
                    SerdeError::MalformedEnvelope("no type discriminator in message".into())
                })?;
                tracing::trace!(%obj_type, %format, "deserialize");
                let descriptor = registry.lookup(&obj_type)?;
                descriptor.decode(&NativeForm::from_parts(descriptor.schema_name(), bytes))
            }
        }
    }

    /// Decode as `T`, skipping registry lookup for the outer type.
    ///
    /// A discriminator present in the blob that names another type fails
    /// with `TypeMismatch`. For JSON that covers both the envelope `objType`
    /// and an `objType` inside the content.
    pub fn deserialize_as<T: Serializable>(
        &self,
        blob: impl AsRef<[u8]>,
        format: Format,
    ) -> SerdeResult<T> {
        let blob = blob.as_ref();
        envelope::check_decoded_size(blob.len(), &self.config)?;
        tracing::trace!(expected = T::QUALIFIED_NAME, %format, "deserialize");
        let schema = match format {
            Format::Json => {
                let envelope = envelope::decode_json(text(blob)?)?;
                if envelope.obj_type != T::QUALIFIED_NAME {
                    return Err(SerdeError::mismatch(T::QUALIFIED_NAME, envelope.obj_type));
                }
                envelope.check_content_discriminator()?;
                envelope::decode_json_content::<T::Schema>(&envelope.content)?
            }
            Format::Native | Format::Hex => {
                let bytes = self.binary_input(blob, format)?;
                if let Some(found) = envelope::read_discriminator(&bytes)? {
                    if found != T::QUALIFIED_NAME {
                        return Err(SerdeError::mismatch(T::QUALIFIED_NAME, found));
                    }
                }
                NativeForm::from_parts(<T::Schema as Schema>::FULL_NAME, bytes).decode()?
            }
        };
        T::from_native(schema)
    }

    fn native_bytes<T: SerializableObject + ?Sized>(&self, obj: &T) -> SerdeResult<Vec<u8>> {
        let bytes = obj.to_native_form()?.into_bytes();
        envelope::check_encoded_size(bytes.len(), &self.config)?;
        Ok(bytes)
    }

    fn binary_input(&self, blob: &[u8], format: Format) -> SerdeResult<Vec<u8>> {
        match format {
            Format::Hex => {
                let bytes = envelope::decode_hex(text(blob)?)?;
                envelope::check_decoded_size(bytes.len(), &self.config)?;
                Ok(bytes)
            }
            _ => Ok(blob.to_vec()),
        }
    }
}

fn text(blob: &[u8]) -> SerdeResult<&str> {
    std::str::from_utf8(blob).map_err(|e| SerdeError::MalformedEnvelope(e.to_string()))
}

/// Encode with the default codec.
pub fn serialize<T: SerializableObject + ?Sized>(obj: &T, format: Format) -> SerdeResult<Blob> {
    Codec::default().serialize(obj, format)
}

/// Decode with the default codec, resolving the type through the registry.
pub fn deserialize(
    blob: impl AsRef<[u8]>,
    format: Format,
) -> SerdeResult<Box<dyn SerializableObject>> {
    Codec::default().deserialize(blob, format)
}

/// Decode with the default codec as the expected type `T`.
pub fn deserialize_as<T: Serializable>(blob: impl AsRef<[u8]>, format: Format) -> SerdeResult<T> {
    Codec::default().deserialize_as(blob, format)
}

/// Per-format shorthands on every serializable value.
pub trait SerializableExt: SerializableObject {
    fn to_blob(&self, format: Format) -> SerdeResult<Blob> {
        serialize(self, format)
    }

    fn to_binary(&self) -> SerdeResult<Vec<u8>> {
        Ok(serialize(self, Format::Native)?.into_bytes())
    }

    fn to_hex(&self) -> SerdeResult<String> {
        Ok(envelope::encode_hex(&self.to_binary()?))
    }

    fn to_json(&self) -> SerdeResult<String> {
        match serialize(self, Format::Json)? {
            Blob::Text(text) => Ok(text),
            Blob::Binary(_) => Err(SerdeError::Encode("json produced binary output".into())),
        }
    }
}

impl<T: SerializableObject + ?Sized> SerializableExt for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::tests::{counter, Counter, CounterSchema, Gauge};
    use crate::config::JsonStyle;

    fn registered() {
        let registry = TypeRegistry::global();
        registry.register_type::<Counter>().unwrap();
        registry.register_type::<Gauge>().unwrap();
    }

    #[test]
    fn format_display_and_parse() {
        for format in [Format::Native, Format::Json, Format::Hex] {
            assert_eq!(format.to_string().parse::<Format>().unwrap(), format);
        }
        assert_eq!("binary".parse::<Format>().unwrap(), Format::Native);
        assert!("xml".parse::<Format>().is_err());
    }

    #[test]
    fn typed_roundtrip_all_formats() {
        registered();
        for format in [Format::Native, Format::Json, Format::Hex] {
            let blob = serialize(&counter(21), format).unwrap();
            let back: Counter = deserialize_as(&blob, format).unwrap();
            assert_eq!(back, counter(21), "format {format}");
        }
    }

    #[test]
    fn untyped_roundtrip_all_formats() {
        registered();
        for format in [Format::Native, Format::Json, Format::Hex] {
            let blob = serialize(&counter(8), format).unwrap();
            let obj = deserialize(&blob, format).unwrap();
            assert_eq!(obj.downcast_ref::<Counter>(), Some(&counter(8)), "format {format}");
        }
    }

    #[test]
    fn hex_is_native_bytes_in_hex() {
        let native = serialize(&counter(1), Format::Native).unwrap();
        let hex = serialize(&counter(1), Format::Hex).unwrap();
        assert_eq!(hex.as_text().unwrap(), envelope::encode_hex(native.as_ref()));
    }

    #[test]
    fn json_envelope_shape() {
        let blob = serialize(&counter(2), Format::Json).unwrap();
        let text = blob.as_text().unwrap();
        let outer: serde_json::Value = serde_json::from_str(text).unwrap();
        assert_eq!(outer["objType"], "stow.test.Counter");
        let content = outer["content"].as_str().expect("content is a string");
        let inner: serde_json::Value = serde_json::from_str(content).unwrap();
        assert_eq!(inner["count"], 2);
        assert_eq!(inner["label"], "hits");
    }

    #[test]
    fn compact_codec_writes_compact_json() {
        let codec = Codec::new(CodecConfig {
            json_style: JsonStyle::Compact,
            ..Default::default()
        });
        let blob = codec.serialize(&Gauge { level: 3 }, Format::Json).unwrap();
        assert_eq!(
            blob.as_text().unwrap(),
            r#"{"objType":"stow.test.Gauge","content":"{\"count\":3,\"label\":\"gauge\"}"}"#
        );
    }

    #[test]
    fn untyped_native_without_discriminator_is_malformed() {
        registered();
        let blob = serialize(&Gauge { level: 1 }, Format::Native).unwrap();
        let err = deserialize(&blob, Format::Native).unwrap_err();
        assert!(matches!(err, SerdeError::MalformedEnvelope(_)));

        // The same bytes decode fine with an expected type.
        let back: Gauge = deserialize_as(&blob, Format::Native).unwrap();
        assert_eq!(back, Gauge { level: 1 });
    }

    #[test]
    fn untyped_unregistered_discriminator_is_unknown_type() {
        let schema = CounterSchema {
            obj_type: "stow.test.NeverRegistered".into(),
            count: 1,
            label: "x".into(),
        };
        let bytes = prost::Message::encode_to_vec(&schema);
        let err = deserialize(&bytes, Format::Native).unwrap_err();
        assert_eq!(err, SerdeError::UnknownType("stow.test.NeverRegistered".into()));

        let err = deserialize(envelope::encode_hex(&bytes), Format::Hex).unwrap_err();
        assert_eq!(err, SerdeError::UnknownType("stow.test.NeverRegistered".into()));
    }

    #[test]
    fn untyped_json_unregistered_is_unknown_type() {
        let text = r#"{"objType": "stow.test.NeverRegistered", "content": "{}"}"#;
        let err = deserialize(text, Format::Json).unwrap_err();
        assert_eq!(err, SerdeError::UnknownType("stow.test.NeverRegistered".into()));
    }

    #[test]
    fn typed_json_with_other_objtype_is_mismatch() {
        let blob = serialize(&counter(1), Format::Json).unwrap();
        let err = deserialize_as::<Gauge>(&blob, Format::Json).unwrap_err();
        assert_eq!(err, SerdeError::mismatch("stow.test.Gauge", "stow.test.Counter"));
    }

    #[test]
    fn json_content_naming_other_type_is_mismatch() {
        registered();
        let content = r#"{"objType": "stow.test.Gauge", "count": 1, "label": "hits"}"#;
        let text = envelope::encode_json("stow.test.Counter", content.into(), JsonStyle::Spaced)
            .unwrap();

        let err = deserialize_as::<Counter>(&text, Format::Json).unwrap_err();
        assert_eq!(err, SerdeError::mismatch("stow.test.Counter", "stow.test.Gauge"));
        let err = deserialize(&text, Format::Json).unwrap_err();
        assert_eq!(err, SerdeError::mismatch("stow.test.Counter", "stow.test.Gauge"));

        // Binary input with the same contradiction fails the same way.
        let schema = CounterSchema {
            obj_type: "stow.test.Gauge".into(),
            count: 1,
            label: "hits".into(),
        };
        let bytes = prost::Message::encode_to_vec(&schema);
        assert!(matches!(
            deserialize_as::<Counter>(&bytes, Format::Native).unwrap_err(),
            SerdeError::TypeMismatch { .. }
        ));
    }

    #[test]
    fn typed_native_with_other_discriminator_is_mismatch() {
        let blob = serialize(&counter(1), Format::Native).unwrap();
        let err = deserialize_as::<Gauge>(&blob, Format::Native).unwrap_err();
        assert!(matches!(err, SerdeError::TypeMismatch { .. }));
    }

    #[test]
    fn garbage_input_is_malformed() {
        registered();
        assert!(matches!(
            deserialize([0xffu8, 0xff], Format::Native).unwrap_err(),
            SerdeError::MalformedEnvelope(_)
        ));
        assert!(matches!(
            deserialize("zz", Format::Hex).unwrap_err(),
            SerdeError::MalformedEnvelope(_)
        ));
        assert!(matches!(
            deserialize("{", Format::Json).unwrap_err(),
            SerdeError::MalformedEnvelope(_)
        ));
        assert!(matches!(
            deserialize_as::<Counter>([0xffu8, 0xff], Format::Native).unwrap_err(),
            SerdeError::MalformedEnvelope(_)
        ));
    }

    #[test]
    fn non_utf8_text_is_malformed() {
        assert!(matches!(
            deserialize([0xc3u8, 0x28], Format::Json).unwrap_err(),
            SerdeError::MalformedEnvelope(_)
        ));
    }

    #[test]
    fn from_native_errors_propagate_through_dispatch() {
        registered();
        let text = r#"{"objType": "stow.test.Counter", "content": "{\"count\": 1}"}"#;
        assert!(matches!(
            deserialize(text, Format::Json).unwrap_err(),
            SerdeError::Decode(_)
        ));
        assert!(matches!(
            deserialize_as::<Counter>(text, Format::Json).unwrap_err(),
            SerdeError::Decode(_)
        ));
    }

    #[test]
    fn oversized_messages_are_rejected() {
        let codec = Codec::new(CodecConfig {
            max_message_size: 4,
            ..Default::default()
        });
        for format in [Format::Native, Format::Json, Format::Hex] {
            let err = codec.serialize(&counter(1), format).unwrap_err();
            assert!(matches!(err, SerdeError::Encode(_)), "format {format}");
        }
        let blob = serialize(&counter(1), Format::Native).unwrap();
        let err = codec.deserialize_as::<Counter>(&blob, Format::Native).unwrap_err();
        assert!(matches!(err, SerdeError::MalformedEnvelope(_)));
    }

    #[test]
    fn ext_shorthands_match_serialize() {
        let c = counter(5);
        assert_eq!(c.to_blob(Format::Hex).unwrap(), serialize(&c, Format::Hex).unwrap());
        assert_eq!(c.to_binary().unwrap(), serialize(&c, Format::Native).unwrap().into_bytes());
        assert_eq!(
            c.to_hex().unwrap(),
            serialize(&c, Format::Hex).unwrap().as_text().unwrap()
        );
        assert_eq!(
            c.to_json().unwrap(),
            serialize(&c, Format::Json).unwrap().as_text().unwrap()
        );
    }

    #[test]
    fn serialize_through_trait_object() {
        registered();
        let obj: Box<dyn SerializableObject> = Box::new(counter(13));
        let blob = serialize(obj.as_ref(), Format::Native).unwrap();
        let back = deserialize(&blob, Format::Native).unwrap();
        assert!(*back == *obj);
    }

    mod props {
        use proptest::prelude::*;

        use super::*;

        const FORMATS: [Format; 3] = [Format::Native, Format::Json, Format::Hex];

        proptest! {
            #[test]
            fn counters_roundtrip_typed(count in any::<u64>(), label in "\\PC{1,24}") {
                let value = Counter { count, label };
                for format in FORMATS {
                    let blob = serialize(&value, format).unwrap();
                    prop_assert_eq!(deserialize_as::<Counter>(&blob, format).unwrap(), value.clone());
                }
            }

            #[test]
            fn counters_roundtrip_untyped(count in any::<u64>(), label in "\\PC{1,24}") {
                registered();
                let value = Counter { count, label };
                for format in FORMATS {
                    let blob = serialize(&value, format).unwrap();
                    let obj = deserialize(&blob, format).unwrap();
                    prop_assert_eq!(obj.downcast_ref::<Counter>(), Some(&value));
                }
            }
        }
    }
}
