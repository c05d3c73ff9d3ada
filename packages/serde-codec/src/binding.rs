//! A `Binding` backed by the payload types' own `Serialize` impls.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use docstream_core::{Binding, DocumentWriter, OpaqueValue, Value};

use crate::convert::to_value;
use crate::ser::Serializer;

type Decompose = fn(&OpaqueValue, &mut DocumentWriter) -> Result<bool, docstream_core::Error>;
type Expand = fn(&OpaqueValue) -> Result<Option<Value>, docstream_core::Error>;

#[derive(Clone, Copy)]
struct Entry {
    type_name: &'static str,
    decompose: Decompose,
    expand: Expand,
}

/// Decomposes registered opaque payload types through serde.
///
/// On the write side a registered payload is serialized straight into the
/// writer as ordinary tokens. On the read side an opaque value the document
/// still holds is expanded into a plain `Value` before deserializing.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
/// use docstream_core::{DocumentCodec, Value};
/// use docstream_serde::SerdeBinding;
///
/// let binding = SerdeBinding::new().register::<Duration>();
/// let codec = DocumentCodec::builder().binding(Arc::new(binding)).build();
///
/// let doc = codec.encode(|w| {
///     w.write_start_object()?;
///     w.write_field_name("timeout")?;
///     w.write_any(Duration::from_secs(5))?;
///     w.write_end_object()
/// })?;
/// assert_eq!(
///     doc.get("timeout").and_then(|t| t.get("secs")),
///     Some(&Value::Int64(5))
/// );
/// # Ok::<(), docstream_core::Error>(())
/// ```
#[derive(Clone, Default)]
pub struct SerdeBinding {
    types: HashMap<TypeId, Entry>,
}

impl SerdeBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decompose payloads of type `T` via its `Serialize` impl.
    pub fn register<T: Serialize + Any + Send + Sync>(mut self) -> Self {
        self.types.insert(
            TypeId::of::<T>(),
            Entry {
                type_name: std::any::type_name::<T>(),
                decompose: decompose_as::<T>,
                expand: expand_as::<T>,
            },
        );
        self
    }

    pub fn is_registered<T: Any>(&self) -> bool {
        self.types.contains_key(&TypeId::of::<T>())
    }
}

fn decompose_as<T: Serialize + Any>(
    value: &OpaqueValue,
    writer: &mut DocumentWriter,
) -> Result<bool, docstream_core::Error> {
    match value.downcast_ref::<T>() {
        Some(payload) => {
            payload.serialize(&mut Serializer::new(writer))?;
            Ok(true)
        }
        None => Ok(false),
    }
}

fn expand_as<T: Serialize + Any>(value: &OpaqueValue) -> Result<Option<Value>, docstream_core::Error> {
    match value.downcast_ref::<T>() {
        Some(payload) => Ok(Some(to_value(payload)?)),
        None => Ok(None),
    }
}

impl Binding for SerdeBinding {
    fn decompose(
        &self,
        value: &OpaqueValue,
        writer: &mut DocumentWriter,
    ) -> Result<bool, docstream_core::Error> {
        match self.types.get(&value.payload_type_id()) {
            Some(entry) => {
                tracing::trace!(type_name = entry.type_name, "decomposing through serde");
                (entry.decompose)(value, writer)
            }
            None => Ok(false),
        }
    }

    fn expand(&self, value: &OpaqueValue) -> Result<Option<Value>, docstream_core::Error> {
        match self.types.get(&value.payload_type_id()) {
            Some(entry) => (entry.expand)(value),
            None => Ok(None),
        }
    }
}

impl fmt::Debug for SerdeBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.types.values().map(|e| e.type_name).collect();
        names.sort_unstable();
        f.debug_struct("SerdeBinding").field("types", &names).finish()
    }
}
