//! Storable objects for Stow.
//!
//! A [`StorableObject`] binds a [`Uid`](stow_types::Uid) key to an arbitrary
//! serializable payload plus optional description and tags. Wrapper types
//! that share its wire schema implement [`StorableType`] and customize
//! reconstruction through [`StorableType::construct_new_object`].

pub mod object;

pub use object::{
    decode, encode, StorableObject, StorableObjectSchema, StorableParts, StorableType, TagList,
};

use stow_codec::{SerdeResult, TypeRegistry};

/// Register every serializable type defined in this crate and its
/// dependencies.
pub fn register_types(registry: &TypeRegistry) -> SerdeResult<()> {
    stow_types::register_types(registry)?;
    registry.register_type::<StorableObject>()
}

/// Register the built-in types in the global registry.
pub fn register_builtin_types() -> SerdeResult<()> {
    let registry = TypeRegistry::global();
    register_types(registry)?;
    tracing::debug!(types = registry.len(), "registered built-in types");
    Ok(())
}
