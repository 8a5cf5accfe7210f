//! Polymorphic serialization core for Stow.
//!
//! Any type implementing [`Serializable`] can be encoded into one of three
//! interchangeable formats and decoded back into the correct concrete type,
//! even when the caller does not know that type in advance.
//!
//! # Layers
//!
//! - [`Serializable`] / [`SerializableObject`] -- the capability: map state
//!   onto a [`Schema`] message (the native form) and back
//! - [`TypeRegistry`] -- qualified name to [`TypeDescriptor`]; resolves
//!   polymorphic decode
//! - [`envelope`] -- native bytes, hex text, and the two-level JSON envelope;
//!   [`AnyMessage`] nests one message inside another
//! - [`Codec`], [`serialize`], [`deserialize`], [`deserialize_as`] -- the
//!   public encode/decode entry points
//!
//! # Formats
//!
//! | [`Format`] | Output |
//! |------------|--------|
//! | `Native` | protobuf wire bytes |
//! | `Json` | `{"objType": ..., "content": "<json string>"}` |
//! | `Hex` | lowercase hex of the native bytes |

pub mod capability;
pub mod config;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod registry;
pub mod schema;

pub use capability::{Serializable, SerializableObject};
pub use config::{CodecConfig, JsonStyle};
pub use dispatch::{deserialize, deserialize_as, serialize, Blob, Codec, Format, SerializableExt};
pub use error::{SerdeError, SerdeResult};
pub use registry::{TypeDescriptor, TypeRegistry};
pub use schema::{base64_bytes, AnyMessage, NativeForm, Schema, TYPE_URL_PREFIX};
