//! Native type registry and the data-binding hook.

use std::any::{Any, TypeId};
use std::collections::HashSet;

use crate::value::{OpaqueValue, Value};
use crate::writer::DocumentWriter;
use crate::Error;

/// Opaque payload types the document format stores as-is.
///
/// A payload whose type is in the set takes the fast path in
/// [`DocumentWriter::write_opaque`]; anything else has to be decomposed by a
/// [`Binding`].
#[derive(Clone, Debug, Default)]
pub struct NativeTypes {
    types: HashSet<TypeId>,
}

impl NativeTypes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` as native.
    pub fn insert<T: Any>(&mut self) {
        self.types.insert(TypeId::of::<T>());
    }

    /// Builder-style `insert`.
    pub fn with<T: Any>(mut self) -> Self {
        self.insert::<T>();
        self
    }

    pub fn contains<T: Any>(&self) -> bool {
        self.contains_type(TypeId::of::<T>())
    }

    pub fn contains_type(&self, type_id: TypeId) -> bool {
        self.types.contains(&type_id)
    }

    /// Whether `value` is an opaque payload that is not native.
    pub fn is_foreign(&self, value: &OpaqueValue) -> bool {
        !self.contains_type(value.payload_type_id())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// The data-binding layer, as seen from the codec.
///
/// Supplied by the caller to handle opaque payloads the format cannot store
/// natively.
///
/// # Example
///
/// ```rust
/// use docstream_core::{Binding, DocumentWriter, Error, OpaqueValue};
/// use std::time::Duration;
///
/// struct DurationBinding;
///
/// impl Binding for DurationBinding {
///     fn decompose(&self, value: &OpaqueValue, writer: &mut DocumentWriter) -> Result<bool, Error> {
///         match value.downcast_ref::<Duration>() {
///             Some(d) => {
///                 writer.write_i64(d.as_millis() as i64)?;
///                 Ok(true)
///             }
///             None => Ok(false),
///         }
///     }
/// }
/// ```
pub trait Binding: Send + Sync {
    /// Write `value` through `writer` as ordinary token calls, as exactly
    /// one value (a scalar or one balanced composite).
    ///
    /// Returns `Ok(false)` if this binding does not know the type.
    fn decompose(&self, value: &OpaqueValue, writer: &mut DocumentWriter) -> Result<bool, Error>;

    /// Turn an opaque payload met while reading into a plain value.
    ///
    /// Returns `Ok(None)` if this binding does not know the type.
    fn expand(&self, value: &OpaqueValue) -> Result<Option<Value>, Error> {
        let _ = value;
        Ok(None)
    }
}
