//! A serde `Deserializer` pulling tokens from a `DocumentReader`.
//!
//! Serde drives this exactly as it would drive a JSON parser: every
//! `deserialize_*` call pulls the next token, and structs, maps and
//! sequences pull until their end token. Fields the target type does not
//! know are skipped with `skip_children`, without walking their contents.

use std::sync::Arc;

use serde::de::{
    self, DeserializeSeed, EnumAccess, IntoDeserializer, MapAccess, SeqAccess, VariantAccess,
    Visitor,
};
use serde::forward_to_deserialize_any;

use docstream_core::{Binding, DocumentReader, IntWidth, TokenKind};

use crate::Error;

/// Deserializes Rust values from a token reader.
pub struct Deserializer<'r, 'a> {
    reader: &'r mut DocumentReader<'a>,
    binding: Option<Arc<dyn Binding>>,
    /// The reader's current token has not been consumed yet.
    peeked: bool,
}

impl<'r, 'a> Deserializer<'r, 'a> {
    /// Deserialize starting at the reader's current token, or at the next
    /// one if the reader has not been advanced yet.
    pub fn new(reader: &'r mut DocumentReader<'a>) -> Self {
        let peeked = reader.current_token().is_some();
        Self {
            reader,
            binding: None,
            peeked,
        }
    }

    /// Expand opaque payloads through `binding`.
    pub fn with_binding(mut self, binding: Option<Arc<dyn Binding>>) -> Self {
        self.binding = binding;
        self
    }

    fn next_token(&mut self) -> Result<TokenKind, Error> {
        if self.peeked {
            self.peeked = false;
            if let Some(kind) = self.reader.current_token() {
                return Ok(kind);
            }
        }
        self.reader
            .advance()
            .ok_or_else(|| docstream_core::Error::structural("unexpected end of token stream").into())
    }

    fn peek_token(&mut self) -> Result<TokenKind, Error> {
        let kind = self.next_token()?;
        self.peeked = true;
        Ok(kind)
    }

    fn visit_token<'de, V: Visitor<'de>>(
        &mut self,
        kind: TokenKind,
        visitor: V,
    ) -> Result<V::Value, Error> {
        match kind {
            TokenKind::StartObject => visitor.visit_map(MapReader { de: self }),
            TokenKind::StartArray => visitor.visit_seq(SeqReader { de: self }),
            TokenKind::Null => visitor.visit_unit(),
            TokenKind::Bool => visitor.visit_bool(self.reader.as_bool()?),
            TokenKind::Int(IntWidth::W32) => visitor.visit_i32(self.reader.as_i32()?),
            TokenKind::Int(IntWidth::W64) => visitor.visit_i64(self.reader.as_i64()?),
            TokenKind::Float => visitor.visit_f64(self.reader.as_f64()?),
            TokenKind::String => visitor.visit_str(self.reader.as_str()?),
            TokenKind::Binary => visitor.visit_bytes(self.reader.as_binary()?),
            TokenKind::FieldName => match self.reader.current_name() {
                Some(name) => visitor.visit_str(name),
                None => Err(unexpected(kind, "field name")),
            },
            TokenKind::Opaque => self.visit_opaque(visitor),
            TokenKind::EndObject | TokenKind::EndArray => Err(unexpected(kind, "a value")),
        }
    }

    /// Expand the current opaque payload through the binding and
    /// deserialize the result in its place.
    fn visit_opaque<'de, V: Visitor<'de>>(&mut self, visitor: V) -> Result<V::Value, Error> {
        let opaque = self.reader.as_opaque()?.clone();
        let expanded = match &self.binding {
            Some(binding) => binding.expand(&opaque)?,
            None => None,
        };
        let Some(value) = expanded else {
            tracing::debug!(type_name = opaque.type_name(), "no binding expands opaque value");
            return Err(docstream_core::Error::unsupported(opaque.type_name()).into());
        };

        let mut reader = DocumentReader::new(&value);
        reader.advance();
        let mut nested = Deserializer::new(&mut reader).with_binding(self.binding.clone());
        de::Deserializer::deserialize_any(&mut nested, visitor)
    }
}

fn unexpected(found: TokenKind, expected: &str) -> Error {
    docstream_core::Error::mismatch(expected, Some(found)).into()
}

macro_rules! deserialize_checked_int {
    ($($method:ident => $visit:ident : $ty:ident),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
                match self.next_token()? {
                    TokenKind::Int(_) => {
                        let wide = self.reader.as_i64()?;
                        let narrow = $ty::try_from(wide)
                            .map_err(|_| docstream_core::Error::overflow(wide, stringify!($ty)))?;
                        visitor.$visit(narrow)
                    }
                    other => self.visit_token(other, visitor),
                }
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for &mut Deserializer<'_, '_> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        let kind = self.next_token()?;
        self.visit_token(kind, visitor)
    }

    // Narrow integers are checked here so an out-of-range value reports a
    // numeric overflow instead of a generic invalid-value message.
    deserialize_checked_int! {
        deserialize_i8 => visit_i8: i8,
        deserialize_i16 => visit_i16: i16,
        deserialize_i32 => visit_i32: i32,
        deserialize_u8 => visit_u8: u8,
        deserialize_u16 => visit_u16: u16,
        deserialize_u32 => visit_u32: u32,
        deserialize_u64 => visit_u64: u64,
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.next_token()? {
            TokenKind::String => visitor.visit_bytes(self.reader.as_str()?.as_bytes()),
            other => self.visit_token(other, visitor),
        }
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        if self.peek_token()? == TokenKind::Null {
            self.peeked = false;
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.next_token()? {
            TokenKind::Null => visitor.visit_unit(),
            other => Err(unexpected(other, "null")),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        match self.next_token()? {
            TokenKind::String => {
                let variant = self.reader.as_str()?;
                visitor.visit_enum(IntoDeserializer::<'_, Error>::into_deserializer(variant))
            }
            TokenKind::StartObject => {
                let value = visitor.visit_enum(EnumReader { de: &mut *self })?;
                match self.next_token()? {
                    TokenKind::EndObject => Ok(value),
                    other => Err(unexpected(other, "end of externally tagged enum")),
                }
            }
            other => Err(unexpected(other, "enum")),
        }
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.next_token()?;
        self.reader.skip_children();
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        bool i64 i128 u128 f32 f64 char str string
        unit_struct seq tuple tuple_struct map struct identifier
    }
}

struct MapReader<'d, 'r, 'a> {
    de: &'d mut Deserializer<'r, 'a>,
}

impl<'de> MapAccess<'de> for MapReader<'_, '_, '_> {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>, Error> {
        match self.de.next_token()? {
            TokenKind::EndObject => Ok(None),
            TokenKind::FieldName => match self.de.reader.current_name() {
                Some(name) => seed.deserialize(KeyDeserializer { key: name }).map(Some),
                None => Err(unexpected(TokenKind::FieldName, "named field")),
            },
            other => Err(unexpected(other, "field name or end of object")),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, Error> {
        seed.deserialize(&mut *self.de)
    }
}

struct SeqReader<'d, 'r, 'a> {
    de: &'d mut Deserializer<'r, 'a>,
}

impl<'de> SeqAccess<'de> for SeqReader<'_, '_, '_> {
    type Error = Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>, Error> {
        if self.de.peek_token()? == TokenKind::EndArray {
            self.de.peeked = false;
            return Ok(None);
        }
        seed.deserialize(&mut *self.de).map(Some)
    }
}

struct EnumReader<'d, 'r, 'a> {
    de: &'d mut Deserializer<'r, 'a>,
}

impl<'de, 'd, 'r, 'a> EnumAccess<'de> for EnumReader<'d, 'r, 'a> {
    type Error = Error;
    type Variant = Self;

    fn variant_seed<V: DeserializeSeed<'de>>(self, seed: V) -> Result<(V::Value, Self), Error> {
        match self.de.next_token()? {
            TokenKind::FieldName => {
                let value = match self.de.reader.current_name() {
                    Some(name) => seed.deserialize(KeyDeserializer { key: name })?,
                    None => return Err(unexpected(TokenKind::FieldName, "variant name")),
                };
                Ok((value, self))
            }
            other => Err(unexpected(other, "variant name")),
        }
    }
}

impl<'de> VariantAccess<'de> for EnumReader<'_, '_, '_> {
    type Error = Error;

    fn unit_variant(self) -> Result<(), Error> {
        de::Deserialize::deserialize(&mut *self.de)
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value, Error> {
        seed.deserialize(&mut *self.de)
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, Error> {
        de::Deserializer::deserialize_seq(&mut *self.de, visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        de::Deserializer::deserialize_map(&mut *self.de, visitor)
    }
}

/// Deserializes an object key. Keys are always strings in a document, so
/// integer targets parse them back (mirroring how the serializer writes
/// integer map keys).
struct KeyDeserializer<'k> {
    key: &'k str,
}

macro_rules! deserialize_parsed_key {
    ($($method:ident => $visit:ident : $ty:ty),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
                match self.key.parse::<$ty>() {
                    Ok(n) => visitor.$visit(n),
                    Err(_) => visitor.visit_str(self.key),
                }
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for KeyDeserializer<'_> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_str(self.key)
    }

    deserialize_parsed_key! {
        deserialize_i8 => visit_i8: i8,
        deserialize_i16 => visit_i16: i16,
        deserialize_i32 => visit_i32: i32,
        deserialize_i64 => visit_i64: i64,
        deserialize_u8 => visit_u8: u8,
        deserialize_u16 => visit_u16: u16,
        deserialize_u32 => visit_u32: u32,
        deserialize_u64 => visit_u64: u64,
        deserialize_bool => visit_bool: bool,
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        visitor.visit_enum(IntoDeserializer::<'_, Error>::into_deserializer(self.key))
    }

    forward_to_deserialize_any! {
        i128 u128 f32 f64 char str string bytes byte_buf option unit unit_struct
        seq tuple tuple_struct map struct identifier ignored_any
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docstream_core::Value;
    use serde::Deserialize;
    use std::collections::HashMap;

    #[derive(Debug, PartialEq, Deserialize)]
    struct User {
        name: String,
        age: u32,
        nickname: Option<String>,
    }

    fn user_doc() -> Value {
        let extra: Value = [("deep", Value::from(vec![1, 2, 3]))].into_iter().collect();
        [
            ("name", Value::from("Alice")),
            ("extra", extra),
            ("age", Value::from(30)),
            ("nickname", Value::Null),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn struct_with_unknown_field() {
        let doc = user_doc();
        let mut reader = DocumentReader::new(&doc);
        let user = User::deserialize(&mut Deserializer::new(&mut reader)).unwrap();
        assert_eq!(
            user,
            User {
                name: "Alice".to_string(),
                age: 30,
                nickname: None,
            }
        );
        assert_eq!(reader.current_token(), Some(TokenKind::EndObject));
        assert_eq!(reader.advance(), None);
    }

    #[test]
    fn starts_at_current_token() {
        let inner: Value = [("name", "Bob"), ("age", "x")].into_iter().collect();
        let doc: Value = [("user", inner)].into_iter().collect();
        let mut reader = DocumentReader::new(&doc);
        reader.advance();
        reader.advance();
        assert_eq!(reader.current_name(), Some("user"));
        reader.advance();

        let value = Value::deserialize(&mut Deserializer::new(&mut reader)).unwrap();
        assert_eq!(value.get("name"), Some(&Value::from("Bob")));
        assert_eq!(reader.advance(), Some(TokenKind::EndObject));
        assert_eq!(reader.depth(), Some(0));
    }

    #[test]
    fn integer_map_keys() {
        let doc: Value = [("1", "one"), ("20", "twenty")].into_iter().collect();
        let mut reader = DocumentReader::new(&doc);
        let map = HashMap::<u32, String>::deserialize(&mut Deserializer::new(&mut reader)).unwrap();
        assert_eq!(map.get(&20).map(String::as_str), Some("twenty"));
    }

    #[test]
    fn narrowing_overflow_is_reported() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Small {
            n: i32,
        }

        let doc: Value = [("n", Value::Int64(i64::MAX))].into_iter().collect();
        let mut reader = DocumentReader::new(&doc);
        let err = Small::deserialize(&mut Deserializer::new(&mut reader)).unwrap_err();
        assert!(matches!(
            err.codec(),
            Some(docstream_core::Error::NumericOverflow { .. })
        ));
    }

    fn read_n<T: for<'de> Deserialize<'de>>(n: Value) -> Result<T, Error> {
        let doc: Value = [("n", n)].into_iter().collect();
        let mut reader = DocumentReader::new(&doc);
        reader.advance();
        reader.advance();
        reader.advance();
        T::deserialize(&mut Deserializer::new(&mut reader))
    }

    fn overflow_target(err: Error) -> Option<&'static str> {
        match err.codec() {
            Some(docstream_core::Error::NumericOverflow { target, .. }) => Some(*target),
            _ => None,
        }
    }

    #[test]
    fn every_narrow_width_reports_overflow() {
        assert_eq!(overflow_target(read_n::<i8>(Value::Int32(200)).unwrap_err()), Some("i8"));
        assert_eq!(overflow_target(read_n::<i16>(Value::Int32(-40_000)).unwrap_err()), Some("i16"));
        assert_eq!(overflow_target(read_n::<i32>(Value::Int64(1 << 40)).unwrap_err()), Some("i32"));
        assert_eq!(overflow_target(read_n::<u8>(Value::Int32(300)).unwrap_err()), Some("u8"));
        assert_eq!(overflow_target(read_n::<u16>(Value::Int32(-1)).unwrap_err()), Some("u16"));
        assert_eq!(overflow_target(read_n::<u32>(Value::Int64(1 << 40)).unwrap_err()), Some("u32"));
        assert_eq!(overflow_target(read_n::<u64>(Value::Int64(-5)).unwrap_err()), Some("u64"));
    }

    #[test]
    fn in_range_narrow_widths() {
        assert_eq!(read_n::<i8>(Value::Int64(-128)).unwrap(), -128);
        assert_eq!(read_n::<u8>(Value::Int32(255)).unwrap(), 255);
        assert_eq!(read_n::<u32>(Value::Int64(4_000_000_000)).unwrap(), 4_000_000_000);
        assert_eq!(read_n::<u64>(Value::Int32(7)).unwrap(), 7);
    }

    #[test]
    fn premature_end() {
        let doc: Value = [("a", 1)].into_iter().collect();
        let mut reader = DocumentReader::new(&doc);
        while reader.advance().is_some() {}
        let err = Value::deserialize(&mut Deserializer::new(&mut reader)).unwrap_err();
        assert!(err.to_string().contains("unexpected end"));
    }
}
