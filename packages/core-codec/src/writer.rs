//! Token writer that assembles a document.
//!
//! `DocumentWriter` accepts generator-style calls and builds a `Value`.
//! The frame stack mirrors the nesting of the calls:
//!
//! - `Root`: accepts exactly one object (or a whole object tree)
//! - `Object`: needs a pending field name before each member
//! - `Array`: appends in call order
//!
//! A child container is inserted into its parent as soon as it is opened,
//! so `document()` shows a partially built tree at any point. Frames record
//! where their container lives (`Slot`) rather than owning it.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::native::{Binding, NativeTypes};
use crate::value::{OpaqueValue, Value};
use crate::Error;

/// Location of a frame's container inside its parent container.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    /// The document itself.
    Document,
    /// Position in the parent object's entry list.
    Entry(usize),
    /// Position in the parent array.
    Element(usize),
}

#[derive(Debug)]
enum Frame {
    Root { attached: bool },
    Object { slot: Slot, pending: Option<String>, written: usize },
    Array { slot: Slot, written: usize },
}

impl Frame {
    /// Values attached directly to this frame so far.
    fn written(&self) -> usize {
        match self {
            Frame::Root { attached } => usize::from(*attached),
            Frame::Object { written, .. } | Frame::Array { written, .. } => *written,
        }
    }
}

/// A generator-style writer producing a document `Value`.
///
/// # Example
///
/// ```rust
/// use docstream_core::{DocumentWriter, Value};
///
/// let mut writer = DocumentWriter::new();
/// writer.write_start_object()?;
/// writer.write_field_name("name")?;
/// writer.write_string("Alice")?;
/// writer.write_field_name("scores")?;
/// writer.write_start_array()?;
/// writer.write_i32(7)?;
/// writer.write_end_array()?;
/// writer.write_end_object()?;
///
/// let doc = writer.finish()?;
/// assert_eq!(doc.get("name"), Some(&Value::from("Alice")));
/// # Ok::<(), docstream_core::Error>(())
/// ```
pub struct DocumentWriter {
    document: Option<Value>,
    frames: Vec<Frame>,
    natives: NativeTypes,
    binding: Option<Arc<dyn Binding>>,
    closed: bool,
}

impl DocumentWriter {
    /// A writer with no native opaque types and no binding.
    pub fn new() -> Self {
        Self::with_options(NativeTypes::default(), None)
    }

    pub fn with_options(natives: NativeTypes, binding: Option<Arc<dyn Binding>>) -> Self {
        Self {
            document: None,
            frames: vec![Frame::Root { attached: false }],
            natives,
            binding,
            closed: false,
        }
    }

    // ==================== Structure ====================

    pub fn write_start_object(&mut self) -> Result<(), Error> {
        self.open(Value::object())
    }

    /// Open an array. Not allowed at the document root.
    pub fn write_start_array(&mut self) -> Result<(), Error> {
        self.open(Value::array())
    }

    pub fn write_end_object(&mut self) -> Result<(), Error> {
        self.check_open()?;
        match self.frames.last() {
            Some(Frame::Object { pending: None, .. }) => {
                self.frames.pop();
                Ok(())
            }
            Some(Frame::Object {
                pending: Some(name),
                ..
            }) => Err(violation(format!(
                "object closed while field name '{}' has no value",
                name
            ))),
            Some(Frame::Array { .. }) => Err(violation("end of object written inside an array")),
            _ => Err(violation("end of object written with no open object")),
        }
    }

    pub fn write_end_array(&mut self) -> Result<(), Error> {
        self.check_open()?;
        match self.frames.last() {
            Some(Frame::Array { .. }) => {
                self.frames.pop();
                Ok(())
            }
            Some(Frame::Object { .. }) => Err(violation("end of array written inside an object")),
            _ => Err(violation("end of array written with no open array")),
        }
    }

    /// Set the name of the next object member.
    pub fn write_field_name(&mut self, name: impl Into<String>) -> Result<(), Error> {
        self.check_open()?;
        match self.frames.last_mut() {
            Some(Frame::Object { pending, .. }) => match pending {
                Some(existing) => Err(violation(format!(
                    "field name '{}' is already pending a value",
                    existing
                ))),
                None => {
                    *pending = Some(name.into());
                    Ok(())
                }
            },
            Some(Frame::Array { .. }) => Err(violation("field name written inside an array")),
            _ => Err(violation("field name written outside an object")),
        }
    }

    // ==================== Values ====================

    /// Write any value.
    ///
    /// Scalars go to the current frame. A composite is attached in one move
    /// unless it holds opaque payloads that are not native, in which case it
    /// is replayed call by call so they can be decomposed. A whole object
    /// may be written at the root as the document.
    pub fn write_value(&mut self, value: Value) -> Result<(), Error> {
        self.check_open()?;
        if let Value::Opaque(opaque) = value {
            return self.write_opaque(opaque);
        }
        if self.has_foreign(&value) {
            return self.write_tree(value);
        }
        self.attach(value).map(drop)
    }

    pub fn write_null(&mut self) -> Result<(), Error> {
        self.write_value(Value::Null)
    }

    pub fn write_bool(&mut self, value: bool) -> Result<(), Error> {
        self.write_value(Value::Bool(value))
    }

    pub fn write_i32(&mut self, value: i32) -> Result<(), Error> {
        self.write_value(Value::Int32(value))
    }

    pub fn write_i64(&mut self, value: i64) -> Result<(), Error> {
        self.write_value(Value::Int64(value))
    }

    pub fn write_f64(&mut self, value: f64) -> Result<(), Error> {
        self.write_value(Value::Float64(value))
    }

    pub fn write_string(&mut self, value: impl Into<String>) -> Result<(), Error> {
        self.write_value(Value::String(value.into()))
    }

    /// Write a binary payload. The bytes are copied; `value` is not retained.
    pub fn write_binary(&mut self, value: &[u8]) -> Result<(), Error> {
        self.write_value(Value::Binary(Bytes::copy_from_slice(value)))
    }

    /// Write an opaque payload.
    ///
    /// Native payload types are stored verbatim. Others are handed to the
    /// binding to decompose, then flattened if they are embedded objects,
    /// and rejected otherwise.
    pub fn write_opaque(&mut self, value: OpaqueValue) -> Result<(), Error> {
        self.check_open()?;
        if self.natives.contains_type(value.payload_type_id()) {
            return self.attach(Value::Opaque(value)).map(drop);
        }

        if let Some(binding) = self.binding.clone() {
            let depth = self.frames.len();
            let before = self.top_written();
            if binding.decompose(&value, self)? {
                if self.frames.len() != depth {
                    return Err(violation(format!(
                        "binding for {} left {} frame(s) unbalanced",
                        value.type_name(),
                        self.frames.len().abs_diff(depth)
                    )));
                }
                let written = self.top_written().saturating_sub(before);
                if written != 1 {
                    return Err(violation(format!(
                        "binding for {} wrote {} value(s) in place of one",
                        value.type_name(),
                        written
                    )));
                }
                if let Some(name) = self.pending_field_name() {
                    return Err(violation(format!(
                        "binding for {} left field name '{}' without a value",
                        value.type_name(),
                        name
                    )));
                }
                return Ok(());
            }
        }

        if let Some(entries) = value.entries() {
            self.write_start_object()?;
            for (name, member) in entries {
                self.write_field_name(name)?;
                self.write_value(member)?;
            }
            return self.write_end_object();
        }

        tracing::debug!(type_name = value.type_name(), "rejecting unsupported value");
        Err(Error::unsupported(value.type_name()))
    }

    /// Wrap `value` as an opaque payload and write it.
    pub fn write_any<T: Any + Send + Sync>(&mut self, value: T) -> Result<(), Error> {
        self.write_opaque(OpaqueValue::new(value))
    }

    // ==================== Lifecycle ====================

    /// Nothing is buffered; succeeds while the writer is open.
    pub fn flush(&mut self) -> Result<(), Error> {
        self.check_open()
    }

    /// Mark the writer terminal. Later writes fail with `Error::Closed`.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// The document as built so far, including unfinished containers.
    pub fn document(&self) -> Option<&Value> {
        self.document.as_ref()
    }

    /// Number of open containers.
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    /// Field name waiting for its value, if the current frame is an object.
    pub fn pending_field_name(&self) -> Option<&str> {
        match self.frames.last() {
            Some(Frame::Object { pending, .. }) => pending.as_deref(),
            _ => None,
        }
    }

    /// Return the finished document.
    ///
    /// Fails if containers are still open or nothing was written.
    pub fn finish(self) -> Result<Value, Error> {
        if self.frames.len() > 1 {
            return Err(violation(format!(
                "document finished with {} open container(s)",
                self.frames.len() - 1
            )));
        }
        self.document
            .ok_or_else(|| violation("document finished before a root object was written"))
    }

    // ==================== Internals ====================

    fn check_open(&self) -> Result<(), Error> {
        if self.closed {
            Err(Error::Closed)
        } else {
            Ok(())
        }
    }

    fn open(&mut self, container: Value) -> Result<(), Error> {
        self.check_open()?;
        let is_object = container.is_object();
        let slot = self.attach(container)?;
        self.frames.push(if is_object {
            Frame::Object {
                slot,
                pending: None,
                written: 0,
            }
        } else {
            Frame::Array { slot, written: 0 }
        });
        Ok(())
    }

    /// Insert `value` into the current frame's container.
    fn attach(&mut self, value: Value) -> Result<Slot, Error> {
        let top = self.frames.len() - 1;
        match &mut self.frames[top] {
            Frame::Root { attached } => {
                if *attached {
                    return Err(violation("document already has a root object"));
                }
                match value {
                    Value::Object(_) => {
                        *attached = true;
                        self.document = Some(value);
                        Ok(Slot::Document)
                    }
                    Value::Array(_) => Err(violation("arrays are not valid top-level documents")),
                    other => Err(violation(format!(
                        "{} value written at the document root",
                        other.kind_name()
                    ))),
                }
            }
            Frame::Object {
                pending, written, ..
            } => {
                let name = pending
                    .take()
                    .ok_or_else(|| violation("object member written without a field name"))?;
                *written += 1;
                match resolve(&mut self.document, &self.frames)? {
                    Value::Object(map) => Ok(Slot::Entry(map.insert_full(name, value).0)),
                    _ => Err(violation("object frame does not hold an object")),
                }
            }
            Frame::Array { written, .. } => {
                *written += 1;
                match resolve(&mut self.document, &self.frames)? {
                    Value::Array(arr) => {
                        arr.push(value);
                        Ok(Slot::Element(arr.len() - 1))
                    }
                    _ => Err(violation("array frame does not hold an array")),
                }
            }
        }
    }

    fn top_written(&self) -> usize {
        self.frames.last().map_or(0, Frame::written)
    }

    fn has_foreign(&self, value: &Value) -> bool {
        match value {
            Value::Opaque(o) => self.natives.is_foreign(o),
            Value::Array(arr) => arr.iter().any(|v| self.has_foreign(v)),
            Value::Object(map) => map.values().any(|v| self.has_foreign(v)),
            _ => false,
        }
    }

    fn write_tree(&mut self, value: Value) -> Result<(), Error> {
        match value {
            Value::Object(map) => {
                self.write_start_object()?;
                for (name, member) in map {
                    self.write_field_name(name)?;
                    self.write_tree(member)?;
                }
                self.write_end_object()
            }
            Value::Array(arr) => {
                self.write_start_array()?;
                for item in arr {
                    self.write_tree(item)?;
                }
                self.write_end_array()
            }
            other => self.write_value(other),
        }
    }
}

impl Default for DocumentWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DocumentWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentWriter")
            .field("frames", &self.frames)
            .field("natives", &self.natives.len())
            .field("has_binding", &self.binding.is_some())
            .field("closed", &self.closed)
            .finish()
    }
}

/// Follow the frame slots from the document down to the innermost container.
fn resolve<'d>(document: &'d mut Option<Value>, frames: &[Frame]) -> Result<&'d mut Value, Error> {
    let mut current = document
        .as_mut()
        .ok_or_else(|| violation("no document is open"))?;
    for frame in frames {
        let slot = match frame {
            Frame::Root { .. } => continue,
            Frame::Object { slot, .. } | Frame::Array { slot, .. } => *slot,
        };
        current = match (slot, current) {
            (Slot::Document, value) => value,
            (Slot::Entry(i), Value::Object(map)) => match map.get_index_mut(i) {
                Some((_, value)) => value,
                None => return Err(violation("object entry for open frame is missing")),
            },
            (Slot::Element(i), Value::Array(arr)) => match arr.get_mut(i) {
                Some(value) => value,
                None => return Err(violation("array element for open frame is missing")),
            },
            _ => return Err(violation("open frame does not match the document")),
        };
    }
    Ok(current)
}

fn violation(message: impl Into<String>) -> Error {
    let error = Error::structural(message);
    tracing::debug!(%error, "rejecting token");
    error
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::EmbeddedObject;
    use std::time::Duration;

    fn assert_structural(result: Result<(), Error>) {
        assert!(
            matches!(result, Err(Error::StructuralViolation { .. })),
            "expected structural violation, got {:?}",
            result
        );
    }

    #[test]
    fn builds_nested_document() {
        let mut w = DocumentWriter::new();
        w.write_start_object().unwrap();
        w.write_field_name("name").unwrap();
        w.write_string("Alice").unwrap();
        w.write_field_name("address").unwrap();
        w.write_start_object().unwrap();
        w.write_field_name("city").unwrap();
        w.write_string("Oslo").unwrap();
        w.write_end_object().unwrap();
        w.write_field_name("scores").unwrap();
        w.write_start_array().unwrap();
        w.write_i32(1).unwrap();
        w.write_start_array().unwrap();
        w.write_i64(2).unwrap();
        w.write_end_array().unwrap();
        w.write_null().unwrap();
        w.write_end_array().unwrap();
        w.write_end_object().unwrap();

        let doc = w.finish().unwrap();
        let address: Value = [("city", "Oslo")].into_iter().collect();
        let expected: Value = [
            ("name", Value::from("Alice")),
            ("address", address),
            (
                "scores",
                Value::Array(vec![
                    Value::Int32(1),
                    Value::Array(vec![Value::Int64(2)]),
                    Value::Null,
                ]),
            ),
        ]
        .into_iter()
        .collect();
        assert_eq!(doc, expected);
    }

    #[test]
    fn children_visible_before_close() {
        let mut w = DocumentWriter::new();
        w.write_start_object().unwrap();
        w.write_field_name("items").unwrap();
        w.write_start_array().unwrap();
        w.write_bool(true).unwrap();

        let partial = w.document().unwrap();
        assert_eq!(
            partial.get("items"),
            Some(&Value::Array(vec![Value::Bool(true)]))
        );
        assert_eq!(w.depth(), 2);
    }

    #[test]
    fn empty_composites() {
        let mut w = DocumentWriter::new();
        w.write_start_object().unwrap();
        w.write_field_name("list").unwrap();
        w.write_start_array().unwrap();
        w.write_end_array().unwrap();
        w.write_field_name("map").unwrap();
        w.write_start_object().unwrap();
        w.write_end_object().unwrap();
        w.write_end_object().unwrap();

        let doc = w.finish().unwrap();
        assert_eq!(doc.get("list"), Some(&Value::array()));
        assert_eq!(doc.get("map"), Some(&Value::object()));
    }

    #[test]
    fn scalar_without_field_name() {
        let mut w = DocumentWriter::new();
        w.write_start_object().unwrap();
        assert_structural(w.write_string("orphan"));
        assert_structural(w.write_start_object());
    }

    #[test]
    fn field_name_twice() {
        let mut w = DocumentWriter::new();
        w.write_start_object().unwrap();
        w.write_field_name("a").unwrap();
        assert_structural(w.write_field_name("b"));
        assert_eq!(w.pending_field_name(), Some("a"));
    }

    #[test]
    fn field_name_in_array() {
        let mut w = DocumentWriter::new();
        w.write_start_object().unwrap();
        w.write_field_name("a").unwrap();
        w.write_start_array().unwrap();
        assert_structural(w.write_field_name("x"));
    }

    #[test]
    fn root_rules() {
        let mut w = DocumentWriter::new();
        assert_structural(w.write_start_array());
        assert_structural(w.write_i32(1));
        assert_structural(w.write_field_name("a"));
        assert_structural(w.write_end_object());

        w.write_start_object().unwrap();
        w.write_end_object().unwrap();
        assert_structural(w.write_start_object());
    }

    #[test]
    fn whole_object_at_root() {
        let doc: Value = [("a", 1)].into_iter().collect();
        let mut w = DocumentWriter::new();
        w.write_value(doc.clone()).unwrap();
        assert_structural(w.write_value(Value::object()));
        assert_eq!(w.finish().unwrap(), doc);

        let mut w = DocumentWriter::new();
        assert_structural(w.write_value(Value::from(vec![1])));
    }

    #[test]
    fn mismatched_ends() {
        let mut w = DocumentWriter::new();
        w.write_start_object().unwrap();
        assert_structural(w.write_end_array());
        w.write_field_name("a").unwrap();
        assert_structural(w.write_end_object());
        w.write_start_array().unwrap();
        assert_structural(w.write_end_object());
        w.write_end_array().unwrap();
        w.write_end_object().unwrap();
    }

    #[test]
    fn finish_checks_balance() {
        let mut w = DocumentWriter::new();
        w.write_start_object().unwrap();
        assert!(matches!(
            w.finish(),
            Err(Error::StructuralViolation { .. })
        ));

        let w = DocumentWriter::new();
        assert!(matches!(
            w.finish(),
            Err(Error::StructuralViolation { .. })
        ));
    }

    #[test]
    fn duplicate_field_replaces_in_place() {
        let mut w = DocumentWriter::new();
        w.write_start_object().unwrap();
        w.write_field_name("a").unwrap();
        w.write_i32(1).unwrap();
        w.write_field_name("b").unwrap();
        w.write_i32(2).unwrap();
        w.write_field_name("a").unwrap();
        w.write_start_array().unwrap();
        w.write_i32(3).unwrap();
        w.write_end_array().unwrap();
        w.write_end_object().unwrap();

        let doc = w.finish().unwrap();
        let keys: Vec<&String> = doc.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["a", "b"]);
        assert_eq!(doc.get("a"), Some(&Value::from(vec![3])));
    }

    #[test]
    fn binary_is_copied() {
        let mut buf = vec![1u8, 2, 3];
        let mut w = DocumentWriter::new();
        w.write_start_object().unwrap();
        w.write_field_name("data").unwrap();
        w.write_binary(&buf).unwrap();
        buf[0] = 42;
        w.write_end_object().unwrap();

        let doc = w.finish().unwrap();
        assert_eq!(
            doc.get("data").and_then(Value::as_bytes).map(|b| b.to_vec()),
            Some(vec![1, 2, 3])
        );
    }

    #[test]
    fn closed_writer_rejects_writes() {
        let mut w = DocumentWriter::new();
        w.write_start_object().unwrap();
        w.flush().unwrap();
        w.close();
        assert!(w.is_closed());
        assert_eq!(w.write_field_name("a"), Err(Error::Closed));
        assert_eq!(w.flush(), Err(Error::Closed));
    }

    #[test]
    fn native_opaque_is_stored_verbatim() {
        let natives = NativeTypes::new().with::<Duration>();
        let mut w = DocumentWriter::with_options(natives, None);
        let payload = OpaqueValue::new(Duration::from_secs(3));
        w.write_start_object().unwrap();
        w.write_field_name("ttl").unwrap();
        w.write_opaque(payload.clone()).unwrap();
        w.write_end_object().unwrap();

        let doc = w.finish().unwrap();
        assert_eq!(doc.get("ttl"), Some(&Value::Opaque(payload)));
    }

    #[test]
    fn foreign_opaque_without_binding_fails() {
        let mut w = DocumentWriter::new();
        w.write_start_object().unwrap();
        w.write_field_name("ttl").unwrap();
        match w.write_any(Duration::from_secs(3)) {
            Err(Error::UnsupportedValue { type_name }) => assert!(type_name.ends_with("Duration")),
            other => panic!("expected unsupported value, got {:?}", other),
        }
    }

    struct MillisBinding;

    impl Binding for MillisBinding {
        fn decompose(
            &self,
            value: &OpaqueValue,
            writer: &mut DocumentWriter,
        ) -> Result<bool, Error> {
            match value.downcast_ref::<Duration>() {
                Some(d) => {
                    writer.write_start_object()?;
                    writer.write_field_name("millis")?;
                    writer.write_i64(d.as_millis() as i64)?;
                    writer.write_end_object()?;
                    Ok(true)
                }
                None => Ok(false),
            }
        }
    }

    struct LeakyBinding;

    impl Binding for LeakyBinding {
        fn decompose(
            &self,
            _value: &OpaqueValue,
            writer: &mut DocumentWriter,
        ) -> Result<bool, Error> {
            writer.write_start_array()?;
            Ok(true)
        }
    }

    #[test]
    fn foreign_opaque_is_decomposed_by_binding() {
        let mut w = DocumentWriter::with_options(NativeTypes::new(), Some(Arc::new(MillisBinding)));
        w.write_start_object().unwrap();
        w.write_field_name("ttl").unwrap();
        w.write_any(Duration::from_millis(1500)).unwrap();
        w.write_field_name("other").unwrap();
        assert!(matches!(
            w.write_any(7u128),
            Err(Error::UnsupportedValue { .. })
        ));
        w.write_null().unwrap();
        w.write_end_object().unwrap();

        let doc = w.finish().unwrap();
        let ttl: Value = [("millis", Value::Int64(1500))].into_iter().collect();
        assert_eq!(doc.get("ttl"), Some(&ttl));
    }

    #[test]
    fn unbalanced_binding_is_rejected() {
        let mut w = DocumentWriter::with_options(NativeTypes::new(), Some(Arc::new(LeakyBinding)));
        w.write_start_object().unwrap();
        w.write_field_name("x").unwrap();
        assert_structural(w.write_any(1u8));
    }

    /// Runs a fixed sequence of writes for every payload.
    struct ScriptedBinding(fn(&mut DocumentWriter) -> Result<(), Error>);

    impl Binding for ScriptedBinding {
        fn decompose(
            &self,
            _value: &OpaqueValue,
            writer: &mut DocumentWriter,
        ) -> Result<bool, Error> {
            (self.0)(writer)?;
            Ok(true)
        }
    }

    fn scripted(script: fn(&mut DocumentWriter) -> Result<(), Error>) -> DocumentWriter {
        DocumentWriter::with_options(NativeTypes::new(), Some(Arc::new(ScriptedBinding(script))))
    }

    #[test]
    fn binding_must_write_exactly_one_value() {
        // Nothing written for a pending member.
        let mut w = scripted(|_| Ok(()));
        w.write_start_object().unwrap();
        w.write_field_name("x").unwrap();
        assert_structural(w.write_any(1u8));

        // Nothing written inside an array.
        let mut w = scripted(|_| Ok(()));
        w.write_start_object().unwrap();
        w.write_field_name("list").unwrap();
        w.write_start_array().unwrap();
        assert_structural(w.write_any(1u8));

        // Two elements for one payload.
        let mut w = scripted(|w| {
            w.write_i32(1)?;
            w.write_i32(2)
        });
        w.write_start_object().unwrap();
        w.write_field_name("list").unwrap();
        w.write_start_array().unwrap();
        assert_structural(w.write_any(1u8));

        // A second member smuggled into the enclosing object.
        let mut w = scripted(|w| {
            w.write_i32(1)?;
            w.write_field_name("extra")?;
            w.write_i32(2)
        });
        w.write_start_object().unwrap();
        w.write_field_name("x").unwrap();
        assert_structural(w.write_any(1u8));

        // A dangling field name left for the caller.
        let mut w = scripted(|w| {
            w.write_i32(1)?;
            w.write_field_name("extra")
        });
        w.write_start_object().unwrap();
        w.write_field_name("x").unwrap();
        assert_structural(w.write_any(1u8));
    }

    #[test]
    fn binding_writing_one_value_is_accepted() {
        let mut w = scripted(|w| w.write_i32(9));
        w.write_start_object().unwrap();
        w.write_field_name("list").unwrap();
        w.write_start_array().unwrap();
        w.write_any(1u8).unwrap();
        w.write_any(2u8).unwrap();
        w.write_end_array().unwrap();
        w.write_end_object().unwrap();

        let doc = w.finish().unwrap();
        assert_eq!(doc.get("list"), Some(&Value::from(vec![9, 9])));
    }

    #[test]
    fn nested_foreign_opaque_in_tree_is_decomposed() {
        let tree: Value = [
            ("a", Value::from(1)),
            ("ttl", Value::Opaque(OpaqueValue::new(Duration::from_millis(5)))),
        ]
        .into_iter()
        .collect();

        let mut w = DocumentWriter::with_options(NativeTypes::new(), Some(Arc::new(MillisBinding)));
        w.write_value(tree).unwrap();
        let doc = w.finish().unwrap();
        let ttl: Value = [("millis", Value::Int64(5))].into_iter().collect();
        assert_eq!(doc.get("ttl"), Some(&ttl));
        assert_eq!(doc.get("a"), Some(&Value::Int32(1)));
    }

    struct Span {
        start: i64,
        end: i64,
    }

    impl EmbeddedObject for Span {
        fn entries(&self) -> Vec<(String, Value)> {
            vec![
                ("start".to_string(), Value::from(self.start)),
                ("end".to_string(), Value::from(self.end)),
            ]
        }
    }

    #[test]
    fn embedded_object_is_flattened() {
        let mut w = DocumentWriter::new();
        w.write_start_object().unwrap();
        w.write_field_name("span").unwrap();
        w.write_opaque(OpaqueValue::embedded(Span { start: 1, end: 4 }))
            .unwrap();
        w.write_end_object().unwrap();

        let doc = w.finish().unwrap();
        let span: Value = [("start", 1i64), ("end", 4i64)].into_iter().collect();
        assert_eq!(doc.get("span"), Some(&span));
    }
}
