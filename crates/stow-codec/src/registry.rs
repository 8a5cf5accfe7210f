use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use once_cell::sync::Lazy;

use crate::capability::{Serializable, SerializableObject};
use crate::envelope;
use crate::error::{SerdeError, SerdeResult};
use crate::schema::{NativeForm, Schema};

type DecodeNativeFn = fn(&NativeForm) -> SerdeResult<Box<dyn SerializableObject>>;
type DecodeJsonFn = fn(&str) -> SerdeResult<Box<dyn SerializableObject>>;

/// Everything the registry knows about one serializable type.
#[derive(Clone)]
pub struct TypeDescriptor {
    qualified_name: &'static str,
    schema_name: &'static str,
    rust_type: TypeId,
    decode_native: DecodeNativeFn,
    decode_json: DecodeJsonFn,
}

impl TypeDescriptor {
    /// Descriptor for a serializable type.
    pub fn of<T: Serializable>() -> Self {
        Self {
            qualified_name: T::QUALIFIED_NAME,
            schema_name: <T::Schema as Schema>::FULL_NAME,
            rust_type: TypeId::of::<T>(),
            decode_native: decode_native_as::<T>,
            decode_json: decode_json_as::<T>,
        }
    }

    /// The type's qualified name, as written in discriminators.
    pub fn qualified_name(&self) -> &'static str {
        self.qualified_name
    }

    /// Full name of the type's schema message.
    pub fn schema_name(&self) -> &'static str {
        self.schema_name
    }

    /// A blank native form of this type's schema, for type matching.
    pub fn blank(&self) -> NativeForm {
        NativeForm::blank(self.schema_name)
    }

    /// Returns `true` if `form` belongs to this type's schema.
    pub fn accepts(&self, form: &NativeForm) -> bool {
        form.schema_name() == self.schema_name
    }

    /// Decode a filled-in native form through this type's `from_native`.
    pub fn decode(&self, form: &NativeForm) -> SerdeResult<Box<dyn SerializableObject>> {
        if !self.accepts(form) {
            return Err(SerdeError::mismatch(self.schema_name, form.schema_name()));
        }
        (self.decode_native)(form)
    }

    /// Decode JSON content through this type's `from_native`.
    pub fn decode_json(&self, content: &str) -> SerdeResult<Box<dyn SerializableObject>> {
        (self.decode_json)(content)
    }

    /// Two descriptors are the same registration if they describe the same
    /// Rust type with the same schema.
    fn same_as(&self, other: &Self) -> bool {
        self.rust_type == other.rust_type && self.schema_name == other.schema_name
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("qualified_name", &self.qualified_name)
            .field("schema_name", &self.schema_name)
            .finish()
    }
}

fn decode_native_as<T: Serializable>(form: &NativeForm) -> SerdeResult<Box<dyn SerializableObject>> {
    let schema = form.decode::<T::Schema>()?;
    Ok(Box::new(T::from_native(schema)?))
}

fn decode_json_as<T: Serializable>(content: &str) -> SerdeResult<Box<dyn SerializableObject>> {
    let schema = envelope::decode_json_content::<T::Schema>(content)?;
    Ok(Box::new(T::from_native(schema)?))
}

static GLOBAL: Lazy<TypeRegistry> = Lazy::new(TypeRegistry::new);

/// Mapping from qualified type name to [`TypeDescriptor`].
///
/// Registration holds the write lock across the idempotency check and the
/// insert. Lookups take the read lock only.
pub struct TypeRegistry {
    types: RwLock<HashMap<String, TypeDescriptor>>,
}

impl TypeRegistry {
    /// Create an empty registry.
    ///
    /// Decoding always resolves through [`TypeRegistry::global`]; a private
    /// registry is for inspecting or validating a set of registrations.
    pub fn new() -> Self {
        Self {
            types: RwLock::new(HashMap::new()),
        }
    }

    /// The process-wide registry used by the dispatch layer.
    pub fn global() -> &'static TypeRegistry {
        &GLOBAL
    }

    /// Register `descriptor` under `name`.
    ///
    /// Re-registering the same descriptor is a no-op. Registering a
    /// different descriptor under a taken name fails immediately.
    pub fn register(&self, name: &str, descriptor: TypeDescriptor) -> SerdeResult<()> {
        let mut types = self.types.write().expect("registry lock poisoned");
        if let Some(existing) = types.get(name) {
            if existing.same_as(&descriptor) {
                return Ok(());
            }
            tracing::warn!(
                name,
                existing = existing.schema_name,
                new = descriptor.schema_name,
                "conflicting type registration"
            );
            return Err(SerdeError::RegistrationConflict {
                name: name.to_string(),
            });
        }
        tracing::debug!(name, schema = descriptor.schema_name, "registered serializable type");
        types.insert(name.to_string(), descriptor);
        Ok(())
    }

    /// Register `T` under its qualified name.
    pub fn register_type<T: Serializable>(&self) -> SerdeResult<()> {
        self.register(T::QUALIFIED_NAME, TypeDescriptor::of::<T>())
    }

    /// Look up the descriptor registered under `name`.
    pub fn lookup(&self, name: &str) -> SerdeResult<TypeDescriptor> {
        self.types
            .read()
            .expect("registry lock poisoned")
            .get(name)
            .cloned()
            .ok_or_else(|| SerdeError::UnknownType(name.to_string()))
    }

    /// Returns `true` if a type is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.types
            .read()
            .expect("registry lock poisoned")
            .contains_key(name)
    }

    /// Number of registered names.
    pub fn len(&self) -> usize {
        self.types.read().expect("registry lock poisoned").len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted list of registered names.
    pub fn names(&self) -> Vec<String> {
        let types = self.types.read().expect("registry lock poisoned");
        let mut names: Vec<String> = types.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("type_count", &self.len())
            .finish()
    }
}
