//! The codec facade: configuration plus reader/writer entry points.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::native::{Binding, NativeTypes};
use crate::reader::DocumentReader;
use crate::token::TokenKind;
use crate::value::Value;
use crate::writer::DocumentWriter;
use crate::Error;

/// Hands out readers and writers sharing one configuration.
///
/// The codec itself holds no per-pass state. Each `decoder()` or
/// `encoder()` call returns an independent cursor, so a codec can be cloned
/// or shared across threads while every pass stays single-threaded.
///
/// # Example
///
/// ```rust
/// use docstream_core::{DocumentCodec, Value};
///
/// let codec = DocumentCodec::new();
/// let doc = codec.encode(|w| {
///     w.write_start_object()?;
///     w.write_field_name("ok")?;
///     w.write_bool(true)?;
///     w.write_end_object()
/// })?;
///
/// assert_eq!(codec.transcode(&doc)?, doc);
/// # Ok::<(), docstream_core::Error>(())
/// ```
#[derive(Clone, Default)]
pub struct DocumentCodec {
    natives: NativeTypes,
    binding: Option<Arc<dyn Binding>>,
}

impl DocumentCodec {
    /// A codec with no native opaque types and no binding.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> CodecBuilder {
        CodecBuilder::default()
    }

    pub fn natives(&self) -> &NativeTypes {
        &self.natives
    }

    pub fn binding(&self) -> Option<&Arc<dyn Binding>> {
        self.binding.as_ref()
    }

    /// Start reading `document` as a token stream.
    pub fn decoder<'a>(&self, document: &'a Value) -> DocumentReader<'a> {
        DocumentReader::new(document)
    }

    /// Start building a document from token calls.
    pub fn encoder(&self) -> DocumentWriter {
        DocumentWriter::with_options(self.natives.clone(), self.binding.clone())
    }

    /// Build a document by running `write` against a fresh encoder.
    pub fn encode<F>(&self, write: F) -> Result<Value, Error>
    where
        F: FnOnce(&mut DocumentWriter) -> Result<(), Error>,
    {
        let mut writer = self.encoder();
        write(&mut writer)?;
        writer.finish()
    }

    /// Decode `document` and feed every token into a new encoder.
    ///
    /// Embedded objects come back as plain objects; everything else comes
    /// back equal to the input.
    pub fn transcode(&self, document: &Value) -> Result<Value, Error> {
        let mut reader = self.decoder(document);
        let mut writer = self.encoder();
        if reader.advance().is_some() {
            copy_current_structure(&mut reader, &mut writer)?;
        }
        writer.finish()
    }
}

impl fmt::Debug for DocumentCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentCodec")
            .field("natives", &self.natives.len())
            .field("has_binding", &self.binding.is_some())
            .finish()
    }
}

/// Builder for [`DocumentCodec`].
#[derive(Default)]
pub struct CodecBuilder {
    natives: NativeTypes,
    binding: Option<Arc<dyn Binding>>,
}

impl CodecBuilder {
    /// Store opaque payloads of type `T` as-is.
    pub fn native<T: Any>(mut self) -> Self {
        self.natives.insert::<T>();
        self
    }

    /// Replace the whole native type set.
    pub fn natives(mut self, natives: NativeTypes) -> Self {
        self.natives = natives;
        self
    }

    /// Decompose and expand non-native payloads with `binding`.
    pub fn binding(mut self, binding: Arc<dyn Binding>) -> Self {
        self.binding = Some(binding);
        self
    }

    pub fn build(self) -> DocumentCodec {
        DocumentCodec {
            natives: self.natives,
            binding: self.binding,
        }
    }
}

/// Replay the reader's current token into the writer.
pub fn copy_current_event(reader: &DocumentReader<'_>, writer: &mut DocumentWriter) -> Result<(), Error> {
    let Some(kind) = reader.current_token() else {
        return Err(Error::mismatch("any token", None));
    };
    match kind {
        TokenKind::StartObject => writer.write_start_object(),
        TokenKind::EndObject => writer.write_end_object(),
        TokenKind::StartArray => writer.write_start_array(),
        TokenKind::EndArray => writer.write_end_array(),
        TokenKind::FieldName => match reader.current_name() {
            Some(name) => writer.write_field_name(name),
            None => Err(Error::mismatch("named field", Some(kind))),
        },
        _ => match reader.current_value() {
            Some(value) => writer.write_value(value.clone()),
            None => Err(Error::mismatch("scalar value", Some(kind))),
        },
    }
}

/// Replay the current token and, for a field name or start token, the whole
/// value that follows, leaving the reader on the last token copied.
pub fn copy_current_structure(
    reader: &mut DocumentReader<'_>,
    writer: &mut DocumentWriter,
) -> Result<(), Error> {
    if reader.current_token() == Some(TokenKind::FieldName) {
        copy_current_event(reader, writer)?;
        if reader.advance().is_none() {
            return Err(Error::structural("token stream ended after a field name"));
        }
    }

    copy_current_event(reader, writer)?;
    if !reader.current_token().is_some_and(TokenKind::is_start) {
        return Ok(());
    }

    let mut open = 1usize;
    while open > 0 {
        let Some(kind) = reader.advance() else {
            return Err(Error::structural("token stream ended inside a composite"));
        };
        copy_current_event(reader, writer)?;
        if kind.is_start() {
            open += 1;
        } else if kind.is_end() {
            open -= 1;
        }
    }
    Ok(())
}
