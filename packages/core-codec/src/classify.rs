//! Value classification.

use crate::token::{IntWidth, TokenKind};
use crate::value::Value;

/// Map a value to the token kind the reader emits for it.
///
/// Native objects are checked before opaque payloads that can only be
/// coerced into one, so a foreign composite never shadows a real object.
pub fn classify(value: &Value) -> TokenKind {
    match value {
        Value::Null => TokenKind::Null,
        Value::Bool(_) => TokenKind::Bool,
        Value::Float64(_) => TokenKind::Float,
        Value::Int32(_) => TokenKind::Int(IntWidth::W32),
        Value::Int64(_) => TokenKind::Int(IntWidth::W64),
        Value::String(_) => TokenKind::String,
        Value::Array(_) => TokenKind::StartArray,
        Value::Object(_) => TokenKind::StartObject,
        Value::Opaque(o) if o.is_embedded_object() => TokenKind::StartObject,
        Value::Binary(_) => TokenKind::Binary,
        Value::Opaque(_) => TokenKind::Opaque,
    }
}
