use serde::{Deserialize, Serialize};
use stow_codec::{
    AnyMessage, NativeForm, Schema, SerdeError, SerdeResult, Serializable, SerializableObject,
    TypeRegistry,
};
use stow_types::{Uid, UidSchema};

// ---------------------------------------------------------------------------
// Wire schema
// ---------------------------------------------------------------------------

/// Ordered tag sequence. Wrapped in a message so that an empty list and an
/// absent list stay distinguishable on the wire.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagList {
    #[prost(string, repeated, tag = "1")]
    pub values: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
}

/// Wire schema shared by [`StorableObject`] and every [`StorableType`].
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorableObjectSchema {
    /// Qualified name of the outer (wrapper) type.
    #[prost(string, tag = "1")]
    pub obj_type: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: ::core::option::Option<UidSchema>,
    /// Qualified name of the payload type.
    #[prost(string, tag = "3")]
    pub schematic_qualname: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "4")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: ::core::option::Option<AnyMessage>,
    #[prost(string, optional, tag = "5")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(message, optional, tag = "6")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: ::core::option::Option<TagList>,
}

impl Schema for StorableObjectSchema {
    const FULL_NAME: &'static str = "stow.store.StorableObjectSchema";
}

// ---------------------------------------------------------------------------
// StorableObject
// ---------------------------------------------------------------------------

/// A keyed payload with optional search metadata, as held by an object store.
///
/// The payload can be any registered serializable type; it is nested inside
/// the wrapper's encoding with its own discriminator. Values are immutable:
/// the `with_*` methods consume the object and return a new one.
#[derive(Clone, Debug)]
pub struct StorableObject {
    key: Uid,
    data: Box<dyn SerializableObject>,
    description: Option<String>,
    tags: Option<Vec<String>>,
}

/// The fields a storable type is rebuilt from on decode.
#[derive(Clone, Debug)]
pub struct StorableParts {
    pub key: Uid,
    pub data: Box<dyn SerializableObject>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl StorableObject {
    /// Wrap `data` under `key`.
    pub fn new(
        key: Uid,
        data: impl SerializableObject,
        description: Option<String>,
        tags: Option<Vec<String>>,
    ) -> Self {
        Self::from_boxed(key, Box::new(data), description, tags)
    }

    /// Wrap an already type-erased payload.
    pub fn from_boxed(
        key: Uid,
        data: Box<dyn SerializableObject>,
        description: Option<String>,
        tags: Option<Vec<String>>,
    ) -> Self {
        Self {
            key,
            data,
            description,
            tags,
        }
    }

    /// Rebuild from decoded parts.
    pub fn from_parts(parts: StorableParts) -> Self {
        Self::from_boxed(parts.key, parts.data, parts.description, parts.tags)
    }

    /// Split into key, payload and metadata.
    pub fn into_parts(self) -> StorableParts {
        StorableParts {
            key: self.key,
            data: self.data,
            description: self.description,
            tags: self.tags,
        }
    }

    /// The storage key.
    pub fn key(&self) -> &Uid {
        &self.key
    }

    /// The payload, type-erased.
    pub fn data(&self) -> &dyn SerializableObject {
        self.data.as_ref()
    }

    /// The payload as `T`, if that is its concrete type.
    pub fn data_as<T: Serializable>(&self) -> Option<&T> {
        self.data.downcast_ref::<T>()
    }

    /// Free-text description, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Tags in insertion order, if any.
    pub fn tags(&self) -> Option<&[String]> {
        self.tags.as_deref()
    }

    /// Returns `true` if `tag` is among the tags.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags
            .as_ref()
            .is_some_and(|tags| tags.iter().any(|t| t == tag))
    }

    /// Same object with `description` replaced.
    pub fn with_description(self, description: Option<String>) -> Self {
        Self {
            description,
            ..self
        }
    }

    /// Same object with `tags` replaced.
    pub fn with_tags(self, tags: Option<Vec<String>>) -> Self {
        Self { tags, ..self }
    }

    /// Same key and metadata around a new payload.
    pub fn with_data(self, data: impl SerializableObject) -> Self {
        Self {
            data: Box::new(data),
            ..self
        }
    }

    /// Decode a storable schema into whatever wrapper type its `obj_type`
    /// names, delegating reconstruction to that type's descriptor.
    pub fn decode_any(schema: StorableObjectSchema) -> SerdeResult<Box<dyn SerializableObject>> {
        let outer = TypeRegistry::global().lookup(&schema.obj_type)?;
        outer.decode(&NativeForm::encode(&schema))
    }
}

impl PartialEq for StorableObject {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
            && *self.data == *other.data
            && self.description == other.description
            && self.tags == other.tags
    }
}

/// A wrapper type encoded with [`StorableObjectSchema`].
///
/// `construct_new_object` is the reconstruction hook: decode resolves the
/// outer type by `obj_type` and builds the value through that type's hook,
/// so wrapper types can customize reconstruction.
pub trait StorableType: Serializable<Schema = StorableObjectSchema> {
    /// When set, encoding fails unless a description is present.
    const REQUIRE_DESCRIPTION: bool = false;

    /// Build a value of this type from decoded parts.
    fn construct_new_object(parts: StorableParts) -> SerdeResult<Self>;

    /// The wrapped storable object.
    fn storable(&self) -> &StorableObject;
}

impl StorableType for StorableObject {
    fn construct_new_object(parts: StorableParts) -> SerdeResult<Self> {
        Ok(Self::from_parts(parts))
    }

    fn storable(&self) -> &StorableObject {
        self
    }
}

impl Serializable for StorableObject {
    type Schema = StorableObjectSchema;
    const QUALIFIED_NAME: &'static str = "stow.store.StorableObject";

    fn to_native(&self) -> SerdeResult<StorableObjectSchema> {
        encode(self)
    }

    fn from_native(schema: StorableObjectSchema) -> SerdeResult<Self> {
        decode(schema)
    }
}

// ---------------------------------------------------------------------------
// Encode / decode for any storable type
// ---------------------------------------------------------------------------

/// Encode a storable type: key, packed payload with its discriminator, and
/// the outer type name.
pub fn encode<T: StorableType>(obj: &T) -> SerdeResult<StorableObjectSchema> {
    let inner = obj.storable();
    if T::REQUIRE_DESCRIPTION && inner.description.is_none() {
        return Err(SerdeError::Encode(format!(
            "{} requires a description",
            T::QUALIFIED_NAME
        )));
    }
    let key = inner.key.to_native()?;
    let payload = inner.data.to_native_form()?;
    Ok(StorableObjectSchema {
        obj_type: T::QUALIFIED_NAME.to_string(),
        key: Some(key),
        schematic_qualname: inner.data.qualified_name().to_string(),
        data: Some(AnyMessage::pack(&payload)),
        description: inner.description.clone(),
        tags: inner.tags.clone().map(|values| TagList { values }),
    })
}

/// Decode a storable type, resolving both discriminators in the global
/// registry and rebuilding through `T::construct_new_object`.
pub fn decode<T: StorableType>(schema: StorableObjectSchema) -> SerdeResult<T> {
    let registry = TypeRegistry::global();

    let key = schema
        .key
        .ok_or_else(|| SerdeError::Decode("storable object has no key".into()))?;
    let key = Uid::from_native(key)?;

    if schema.obj_type.is_empty() {
        return Err(SerdeError::Decode("storable object has no obj_type".into()));
    }
    registry.lookup(&schema.obj_type)?;
    if schema.obj_type != T::QUALIFIED_NAME {
        return Err(SerdeError::mismatch(T::QUALIFIED_NAME, schema.obj_type));
    }

    if schema.schematic_qualname.is_empty() {
        return Err(SerdeError::Decode("storable object has no schematic_qualname".into()));
    }
    let payload_type = registry.lookup(&schema.schematic_qualname)?;
    let packed = schema
        .data
        .ok_or_else(|| SerdeError::Decode("storable object has no data".into()))?;
    let form = packed.unpack(payload_type.blank())?;
    let data = payload_type.decode(&form)?;

    tracing::trace!(
        obj_type = %schema.obj_type,
        payload = %schema.schematic_qualname,
        "reconstructing storable object"
    );
    T::construct_new_object(StorableParts {
        key,
        data,
        description: schema.description,
        tags: schema.tags.map(|list| list.values),
    })
}
