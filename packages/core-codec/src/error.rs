//! Error types for the codec core.
//!
//! Every error here is fatal to the pass that raised it. The reader and
//! writer are deterministic, so repeating a failed call fails the same way.

use crate::token::TokenKind;

/// Errors raised while streaming a document in either direction.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A token call broke the nesting or field-name rules.
    ///
    /// For example a value written into an object without a field name,
    /// two field names in a row, or an array at the document root.
    #[error("structural violation: {message}")]
    StructuralViolation { message: String },

    /// A typed accessor was called on a token of a different kind.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// An integer does not fit the requested width.
    #[error("numeric overflow: {value} does not fit in {target}")]
    NumericOverflow { value: String, target: &'static str },

    /// The value can neither be stored natively nor decomposed by the binding.
    #[error("unsupported value of type {type_name}")]
    UnsupportedValue { type_name: String },

    /// The data-binding layer failed while decomposing or expanding a value.
    #[error("binding error: {message}")]
    Binding { message: String },

    /// The writer was used after `close()`.
    #[error("writer is closed")]
    Closed,
}

impl Error {
    /// Create a structural violation error.
    pub fn structural(message: impl Into<String>) -> Self {
        Error::StructuralViolation {
            message: message.into(),
        }
    }

    /// Create a type mismatch error for an accessor expecting `expected`.
    pub fn mismatch(expected: impl Into<String>, found: Option<TokenKind>) -> Self {
        Error::TypeMismatch {
            expected: expected.into(),
            found: match found {
                Some(kind) => kind.to_string(),
                None => "no current token".to_string(),
            },
        }
    }

    /// Create a numeric overflow error.
    pub fn overflow(value: impl ToString, target: &'static str) -> Self {
        Error::NumericOverflow {
            value: value.to_string(),
            target,
        }
    }

    /// Create an unsupported value error naming the offending type.
    pub fn unsupported(type_name: impl Into<String>) -> Self {
        Error::UnsupportedValue {
            type_name: type_name.into(),
        }
    }

    pub fn binding(message: impl Into<String>) -> Self {
        Error::Binding {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::IntWidth;

    #[test]
    fn structural_display() {
        let e = Error::structural("field name already set");
        assert_eq!(
            e.to_string(),
            "structural violation: field name already set"
        );
    }

    #[test]
    fn mismatch_names_both_kinds() {
        let e = Error::mismatch("string", Some(TokenKind::Int(IntWidth::W32)));
        let display = e.to_string();
        assert!(display.contains("expected string"));
        assert!(display.contains("int32"));
    }

    #[test]
    fn mismatch_without_token() {
        let e = Error::mismatch("int64", None);
        assert!(e.to_string().contains("no current token"));
    }

    #[test]
    fn overflow_display() {
        let e = Error::overflow(i64::MAX, "i32");
        assert_eq!(
            e.to_string(),
            "numeric overflow: 9223372036854775807 does not fit in i32"
        );
    }

    #[test]
    fn binding_display() {
        let e = Error::binding("missing field `x`");
        assert_eq!(e.to_string(), "binding error: missing field `x`");
    }

    #[test]
    fn unsupported_names_type() {
        let e = Error::unsupported("std::time::Instant");
        assert!(e.to_string().contains("std::time::Instant"));
    }
}
