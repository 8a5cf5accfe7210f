//! Foundation types for Stow.
//!
//! - [`Uid`] -- opaque 128-bit identifier used as the key of stored objects

pub mod uid;

pub use uid::{Uid, UidSchema};

use stow_codec::{SerdeResult, TypeRegistry};

/// Register every serializable type defined in this crate.
pub fn register_types(registry: &TypeRegistry) -> SerdeResult<()> {
    registry.register_type::<Uid>()
}
