//! Token kinds emitted by the reader and accepted by the writer.

use std::fmt;

/// Integer width remembered on integer tokens.
///
/// Widening a 32-bit integer to 64 bits on read is always allowed; the
/// reverse is checked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IntWidth {
    W32,
    W64,
}

/// One structural or scalar event in the token stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    StartObject,
    EndObject,
    StartArray,
    EndArray,
    /// An object key. The following token is its value.
    FieldName,
    Null,
    Bool,
    Int(IntWidth),
    Float,
    String,
    Binary,
    /// A value the codec passes through without interpreting.
    Opaque,
}

impl TokenKind {
    /// `StartObject` or `StartArray`.
    pub fn is_start(self) -> bool {
        matches!(self, TokenKind::StartObject | TokenKind::StartArray)
    }

    /// `EndObject` or `EndArray`.
    pub fn is_end(self) -> bool {
        matches!(self, TokenKind::EndObject | TokenKind::EndArray)
    }

    /// Any token carrying a value rather than structure.
    pub fn is_scalar(self) -> bool {
        !self.is_start() && !self.is_end() && self != TokenKind::FieldName
    }

    /// The end token closing this start token.
    pub fn closing(self) -> Option<TokenKind> {
        match self {
            TokenKind::StartObject => Some(TokenKind::EndObject),
            TokenKind::StartArray => Some(TokenKind::EndArray),
            _ => None,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::StartObject => "start of object",
            TokenKind::EndObject => "end of object",
            TokenKind::StartArray => "start of array",
            TokenKind::EndArray => "end of array",
            TokenKind::FieldName => "field name",
            TokenKind::Null => "null",
            TokenKind::Bool => "bool",
            TokenKind::Int(IntWidth::W32) => "int32",
            TokenKind::Int(IntWidth::W64) => "int64",
            TokenKind::Float => "float64",
            TokenKind::String => "string",
            TokenKind::Binary => "binary",
            TokenKind::Opaque => "opaque",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_tokens_close() {
        assert_eq!(TokenKind::StartObject.closing(), Some(TokenKind::EndObject));
        assert_eq!(TokenKind::StartArray.closing(), Some(TokenKind::EndArray));
        assert_eq!(TokenKind::String.closing(), None);
    }

    #[test]
    fn scalar_classification() {
        assert!(TokenKind::Int(IntWidth::W64).is_scalar());
        assert!(TokenKind::Opaque.is_scalar());
        assert!(!TokenKind::FieldName.is_scalar());
        assert!(!TokenKind::EndArray.is_scalar());
        assert!(TokenKind::EndArray.is_end());
        assert!(TokenKind::StartObject.is_start());
    }
}
