//! docstream core: a document tree seen as a token stream.
//!
//! This layer bridges an in-memory document and the pull-parser /
//! generator protocol a data-binding layer speaks:
//! - `Value`: the document tree (objects keep insertion order)
//! - `DocumentReader`: walks a `Value` and emits tokens, expanding
//!   composites lazily
//! - `DocumentWriter`: takes token calls and builds a `Value`, rejecting
//!   sequences that break nesting or field-name rules
//! - `DocumentCodec`: shared configuration (native types, binding) and the
//!   entry points for both directions
//!
//! Nothing here performs I/O. Readers and writers are single-pass,
//! single-threaded cursors; create one per pass.
//!
//! # Example
//!
//! ```rust
//! use docstream_core::{DocumentCodec, TokenKind, Value};
//!
//! let doc: Value = [("a", 1)].into_iter().collect();
//! let codec = DocumentCodec::new();
//!
//! let tokens: Vec<TokenKind> = codec.decoder(&doc).collect();
//! assert_eq!(tokens.first(), Some(&TokenKind::StartObject));
//! assert_eq!(tokens.last(), Some(&TokenKind::EndObject));
//! ```

pub use bytes::Bytes;

mod classify;
mod codec;
mod error;
mod native;
mod reader;
mod token;
mod value;
mod value_serde;
mod writer;

pub use classify::classify;
pub use codec::{copy_current_event, copy_current_structure, CodecBuilder, DocumentCodec};
pub use error::Error;
pub use native::{Binding, NativeTypes};
pub use reader::{DocumentReader, ReadState};
pub use token::{IntWidth, TokenKind};
pub use value::{EmbeddedObject, Map, OpaqueValue, Value};
pub use writer::DocumentWriter;
