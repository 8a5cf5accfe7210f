use std::any::Any;
use std::fmt::Debug;

use crate::config::JsonStyle;
use crate::envelope;
use crate::error::{SerdeError, SerdeResult};
use crate::schema::{NativeForm, Schema};

/// The capability every participating type implements.
///
/// A serializable type maps its state onto a [`Schema`] message and back.
/// `to_native` must be pure; `from_native` fails with `Decode` when required
/// fields are absent or malformed.
pub trait Serializable: Clone + Debug + PartialEq + Send + Sync + 'static {
    /// The wire schema this type maps onto.
    type Schema: Schema;

    /// Registry key for this type. Identical for every instance, unique
    /// across types.
    const QUALIFIED_NAME: &'static str;

    fn to_native(&self) -> SerdeResult<Self::Schema>;

    fn from_native(schema: Self::Schema) -> SerdeResult<Self>;
}

/// Object-safe view of a [`Serializable`] value.
///
/// Implemented for every `Serializable` type. Polymorphic decode returns
/// `Box<dyn SerializableObject>`.
pub trait SerializableObject: Any + Debug + Send + Sync {
    fn qualified_name(&self) -> &'static str;

    fn to_native_form(&self) -> SerdeResult<NativeForm>;

    /// The schema's fields as a JSON document.
    fn to_json_content(&self, style: JsonStyle) -> SerdeResult<String>;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync>;

    fn eq_object(&self, other: &dyn SerializableObject) -> bool;

    fn clone_object(&self) -> Box<dyn SerializableObject>;
}

impl<T: Serializable> SerializableObject for T {
    fn qualified_name(&self) -> &'static str {
        T::QUALIFIED_NAME
    }

    fn to_native_form(&self) -> SerdeResult<NativeForm> {
        Ok(NativeForm::encode(&self.to_native()?))
    }

    fn to_json_content(&self, style: JsonStyle) -> SerdeResult<String> {
        envelope::to_json_string(&self.to_native()?, style)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync> {
        self
    }

    fn eq_object(&self, other: &dyn SerializableObject) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }

    fn clone_object(&self) -> Box<dyn SerializableObject> {
        Box::new(self.clone())
    }
}

impl dyn SerializableObject {
    /// Returns `true` if the concrete type is `T`.
    pub fn is<T: Serializable>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// The concrete value, if it is a `T`.
    pub fn downcast_ref<T: Serializable>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Take the concrete value out of the box.
    pub fn into_typed<T: Serializable>(self: Box<Self>) -> SerdeResult<T> {
        let found = self.qualified_name();
        self.into_any()
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| SerdeError::mismatch(T::QUALIFIED_NAME, found))
    }
}

impl PartialEq for dyn SerializableObject {
    fn eq(&self, other: &Self) -> bool {
        self.eq_object(other)
    }
}

impl Clone for Box<dyn SerializableObject> {
    fn clone(&self) -> Self {
        self.as_ref().clone_object()
    }
}
