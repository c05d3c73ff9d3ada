//! Serde integration for docstream
//!
//! This layer drives the token bridge from serde. It adds:
//! - `Deserializer`: pulls tokens from a `DocumentReader` into any
//!   `Deserialize` type
//! - `Serializer`: turns any `Serialize` type into `DocumentWriter` calls
//! - `SerdeBinding`: decomposes opaque payloads through their `Serialize` impl
//! - Value <-> serde and Value <-> JSON conversions
//!
//! # Example
//!
//! ```rust
//! use docstream_serde::{from_document, to_document};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct User {
//!     name: String,
//!     age: u32,
//! }
//!
//! let user = User { name: "Alice".into(), age: 30 };
//! let doc = to_document(&user)?;
//! assert_eq!(doc.get("name").and_then(|v| v.as_str()), Some("Alice"));
//!
//! let back: User = from_document(&doc)?;
//! assert_eq!(back, user);
//! # Ok::<(), docstream_serde::Error>(())
//! ```

pub use bytes::Bytes;

mod binding;
mod convert;
mod de;
mod error;
mod ser;

pub use binding::SerdeBinding;
pub use convert::{
    from_document, from_document_with, from_json_slice, from_reader, json_to_value, to_document,
    to_document_with, to_json_vec, to_value, value_to_json,
};
pub use de::Deserializer;
pub use error::Error;
pub use ser::Serializer;

// Re-export core types for convenience
pub use docstream_core::{DocumentCodec, DocumentReader, DocumentWriter, Map, Value};
