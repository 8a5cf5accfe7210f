//! External representations of a native form.
//!
//! | Format | Shape |
//! |--------|-------|
//! | native | protobuf wire bytes of the schema message |
//! | hex    | lowercase hex of the native bytes, no separators |
//! | json   | `{"objType": "<qualified name>", "content": "<schema fields as a JSON string>"}` |
//!
//! The JSON `content` member is itself a JSON-encoded string, so decoding
//! parses twice: once for the outer envelope and once for the content.

use std::io;

use serde::{Deserialize, Serialize};
use serde_json::ser::{CompactFormatter, Formatter};

use crate::config::{CodecConfig, JsonStyle};
use crate::error::{SerdeError, SerdeResult};
use crate::schema::EnvelopeHeader;

/// Outer JSON envelope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonEnvelope {
    #[serde(rename = "objType")]
    pub obj_type: String,
    pub content: String,
}

impl JsonEnvelope {
    /// Reject content whose own `objType` names a different type than the
    /// envelope. Content without one is accepted.
    pub fn check_content_discriminator(&self) -> SerdeResult<()> {
        let header: ContentHeader = decode_json_content(&self.content)?;
        if !header.obj_type.is_empty() && header.obj_type != self.obj_type {
            return Err(SerdeError::mismatch(&self.obj_type, header.obj_type));
        }
        Ok(())
    }
}

/// The `objType` field a schema may carry inside its JSON content.
#[derive(Debug, Default, Deserialize)]
struct ContentHeader {
    #[serde(rename = "objType", default)]
    obj_type: String,
}

/// JSON formatter writing `", "` between items and `": "` after keys.
#[derive(Clone, Copy, Debug, Default)]
pub struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }
}

/// Serialize `value` to a JSON string in the given style.
pub fn to_json_string<T: Serialize + ?Sized>(value: &T, style: JsonStyle) -> SerdeResult<String> {
    let mut buf = Vec::with_capacity(128);
    let written = match style {
        JsonStyle::Spaced => {
            let mut ser = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
            value.serialize(&mut ser)
        }
        JsonStyle::Compact => {
            let mut ser = serde_json::Serializer::with_formatter(&mut buf, CompactFormatter);
            value.serialize(&mut ser)
        }
    };
    written.map_err(|e| SerdeError::Encode(e.to_string()))?;
    String::from_utf8(buf).map_err(|e| SerdeError::Encode(e.to_string()))
}

/// Wrap already-encoded content in the outer JSON envelope.
pub fn encode_json(obj_type: &str, content: String, style: JsonStyle) -> SerdeResult<String> {
    let envelope = JsonEnvelope {
        obj_type: obj_type.to_string(),
        content,
    };
    to_json_string(&envelope, style)
}

/// Parse the outer JSON envelope. The content string is left unparsed.
pub fn decode_json(text: &str) -> SerdeResult<JsonEnvelope> {
    let envelope: JsonEnvelope =
        serde_json::from_str(text).map_err(|e| SerdeError::MalformedEnvelope(e.to_string()))?;
    if envelope.obj_type.is_empty() {
        return Err(SerdeError::MalformedEnvelope("empty objType".into()));
    }
    Ok(envelope)
}

/// Parse JSON content as schema `M`.
pub fn decode_json_content<M: serde::de::DeserializeOwned>(content: &str) -> SerdeResult<M> {
    serde_json::from_str(content).map_err(|e| SerdeError::MalformedEnvelope(e.to_string()))
}

/// Lowercase hex, no separators.
pub fn encode_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Parse hex in either case, ignoring surrounding whitespace.
pub fn decode_hex(text: &str) -> SerdeResult<Vec<u8>> {
    hex::decode(text.trim()).map_err(|e| SerdeError::MalformedEnvelope(format!("invalid hex: {e}")))
}

/// Read the tag-1 `obj_type` discriminator of a top-level message.
pub fn read_discriminator(bytes: &[u8]) -> SerdeResult<Option<String>> {
    EnvelopeHeader::read(bytes)
}

/// Reject encoded output larger than the configured limit.
pub(crate) fn check_encoded_size(len: usize, config: &CodecConfig) -> SerdeResult<()> {
    if len > config.max_message_size {
        return Err(SerdeError::Encode(format!(
            "message too large: {len} bytes (max {})",
            config.max_message_size
        )));
    }
    Ok(())
}

/// Reject input larger than the configured limit before parsing it.
pub(crate) fn check_decoded_size(len: usize, config: &CodecConfig) -> SerdeResult<()> {
    if len > config.max_message_size {
        tracing::debug!(len, max = config.max_message_size, "rejecting oversized input");
        return Err(SerdeError::MalformedEnvelope(format!(
            "message too large: {len} bytes (max {})",
            config.max_message_size
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Sample {
        value: String,
        items: Vec<u32>,
    }

    fn sample() -> Sample {
        Sample {
            value: "+xuw".into(),
            items: vec![1, 2],
        }
    }

    #[test]
    fn spaced_style_separators() {
        let s = to_json_string(&sample(), JsonStyle::Spaced).unwrap();
        assert_eq!(s, r#"{"value": "+xuw", "items": [1, 2]}"#);
    }

    #[test]
    fn compact_style_separators() {
        let s = to_json_string(&sample(), JsonStyle::Compact).unwrap();
        assert_eq!(s, r#"{"value":"+xuw","items":[1,2]}"#);
    }

    #[test]
    fn envelope_content_is_a_string() {
        let text = encode_json("stow.test.X", r#"{"a": 1}"#.into(), JsonStyle::Spaced).unwrap();
        assert_eq!(text, r#"{"objType": "stow.test.X", "content": "{\"a\": 1}"}"#);

        let envelope = decode_json(&text).unwrap();
        assert_eq!(envelope.obj_type, "stow.test.X");
        assert_eq!(envelope.content, r#"{"a": 1}"#);
    }

    #[test]
    fn decode_json_accepts_compact() {
        let envelope = decode_json(r#"{"objType":"T","content":"{}"}"#).unwrap();
        assert_eq!(envelope.obj_type, "T");
    }

    #[test]
    fn decode_json_rejects_nested_object_content() {
        let err = decode_json(r#"{"objType": "T", "content": {"a": 1}}"#).unwrap_err();
        assert!(matches!(err, SerdeError::MalformedEnvelope(_)));
    }

    #[test]
    fn decode_json_rejects_missing_fields() {
        assert!(matches!(
            decode_json(r#"{"content": "{}"}"#).unwrap_err(),
            SerdeError::MalformedEnvelope(_)
        ));
        assert!(matches!(
            decode_json(r#"{"objType": "", "content": "{}"}"#).unwrap_err(),
            SerdeError::MalformedEnvelope(_)
        ));
        assert!(matches!(
            decode_json("not json").unwrap_err(),
            SerdeError::MalformedEnvelope(_)
        ));
    }

    #[test]
    fn content_discriminator_must_agree_with_envelope() {
        let agreeing = decode_json(r#"{"objType": "T", "content": "{\"objType\": \"T\"}"}"#).unwrap();
        assert!(agreeing.check_content_discriminator().is_ok());

        let absent = decode_json(r#"{"objType": "T", "content": "{\"a\": 1}"}"#).unwrap();
        assert!(absent.check_content_discriminator().is_ok());

        let conflicting = decode_json(r#"{"objType": "T", "content": "{\"objType\": \"U\"}"}"#).unwrap();
        assert_eq!(
            conflicting.check_content_discriminator().unwrap_err(),
            SerdeError::mismatch("T", "U")
        );
    }

    #[test]
    fn hex_is_lowercase_without_separators() {
        assert_eq!(encode_hex(&[0x12, 0x10, 0xfb, 0x0a]), "1210fb0a");
        assert_eq!(decode_hex("1210FB0a").unwrap(), vec![0x12, 0x10, 0xfb, 0x0a]);
    }

    #[test]
    fn bad_hex_is_malformed() {
        assert!(matches!(decode_hex("12z").unwrap_err(), SerdeError::MalformedEnvelope(_)));
        assert!(matches!(decode_hex("123").unwrap_err(), SerdeError::MalformedEnvelope(_)));
    }

    #[test]
    fn size_limits() {
        let config = CodecConfig {
            max_message_size: 4,
            ..Default::default()
        };
        assert!(check_encoded_size(4, &config).is_ok());
        assert!(matches!(check_encoded_size(5, &config), Err(SerdeError::Encode(_))));
        assert!(matches!(
            check_decoded_size(5, &config),
            Err(SerdeError::MalformedEnvelope(_))
        ));
    }
}
