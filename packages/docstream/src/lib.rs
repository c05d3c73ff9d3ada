//! docstream: a document tree that speaks the streaming parser protocol.
//!
//! A data-binding layer written against a pull parser and a push generator
//! (`advance`, `current_name`, `write_field_name`, `write_end_object`, ...)
//! can be pointed at an in-memory `Value` instead of a byte stream:
//!
//! - Decoding walks the tree lazily. Composites are expanded only when the
//!   cursor enters them, and skipping a subtree costs the same whatever its
//!   size.
//! - Encoding assembles the tree as tokens arrive and rejects calls that
//!   break the nesting or field-name rules.
//!
//! This crate re-exports the core bridge, and the serde integration under
//! [`typed`].
//!
//! # Crates
//!
//! - `docstream-core`: `Value`, `DocumentReader`, `DocumentWriter`,
//!   `DocumentCodec`
//! - `docstream-serde`: serde `Serializer`/`Deserializer` over the bridge,
//!   `SerdeBinding`, JSON conversion
//!
//! # Example
//!
//! ```rust
//! use docstream::{DocumentCodec, TokenKind, Value};
//!
//! let codec = DocumentCodec::new();
//! let doc = codec.encode(|w| {
//!     w.write_start_object()?;
//!     w.write_field_name("big")?;
//!     w.write_start_object()?;
//!     w.write_field_name("n")?;
//!     w.write_i64(1)?;
//!     w.write_end_object()?;
//!     w.write_field_name("small")?;
//!     w.write_bool(true)?;
//!     w.write_end_object()
//! })?;
//!
//! let mut reader = codec.decoder(&doc);
//! reader.advance(); // start of object
//! reader.advance(); // "big"
//! reader.advance(); // start of the nested object
//! reader.advance_skip_children();
//! assert_eq!(reader.current_name(), Some("small"));
//! assert_eq!(reader.advance(), Some(TokenKind::Bool));
//! assert!(reader.as_bool()?);
//! # Ok::<(), docstream::Error>(())
//! ```

pub use docstream_core::*;

/// Serde integration: typed encode/decode and JSON conversion.
pub use docstream_serde as typed;
