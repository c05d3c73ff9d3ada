//! Conversions between documents, serde types and JSON.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use docstream_core::{DocumentCodec, DocumentReader, DocumentWriter, Map, Value};

use crate::de::Deserializer;
use crate::ser::Serializer;
use crate::Error;

/// Serialize `data` as a document. The top level must be an object.
pub fn to_document<T: ?Sized + Serialize>(data: &T) -> Result<Value, Error> {
    to_document_with(&DocumentCodec::new(), data)
}

/// Serialize `data` as a document through a writer configured by `codec`.
pub fn to_document_with<T: ?Sized + Serialize>(
    codec: &DocumentCodec,
    data: &T,
) -> Result<Value, Error> {
    let mut writer = codec.encoder();
    data.serialize(&mut Serializer::new(&mut writer))?;
    Ok(writer.finish()?)
}

/// Serialize `data` as a value of any shape, scalars and arrays included.
pub fn to_value<T: ?Sized + Serialize>(data: &T) -> Result<Value, Error> {
    // Values other than objects cannot be a document root, so the value is
    // written as the only member of a scratch object.
    let mut writer = DocumentWriter::new();
    writer.write_start_object()?;
    writer.write_field_name("value")?;
    data.serialize(&mut Serializer::new(&mut writer))?;
    writer.write_end_object()?;

    if let Value::Object(map) = writer.finish()? {
        if let Some((_, value)) = map.into_iter().next() {
            return Ok(value);
        }
    }
    Err(docstream_core::Error::structural("serializer produced no value").into())
}

/// Deserialize a `T` from a value.
pub fn from_document<T: DeserializeOwned>(value: &Value) -> Result<T, Error> {
    from_document_with(&DocumentCodec::new(), value)
}

/// Deserialize a `T` from a value, expanding opaque payloads with the
/// codec's binding.
pub fn from_document_with<T: DeserializeOwned>(
    codec: &DocumentCodec,
    value: &Value,
) -> Result<T, Error> {
    let mut reader = codec.decoder(value);
    let data = T::deserialize(
        &mut Deserializer::new(&mut reader).with_binding(codec.binding().cloned()),
    )?;
    if reader.advance().is_some() {
        return Err(docstream_core::Error::structural("trailing tokens after value").into());
    }
    Ok(data)
}

/// Deserialize a `T` from the reader's current position.
///
/// A reader that has not been advanced yet starts at the root. Otherwise the
/// current token is the first one consumed, and the reader is left on the
/// last token of the value.
pub fn from_reader<T: DeserializeOwned>(reader: &mut DocumentReader<'_>) -> Result<T, Error> {
    T::deserialize(&mut Deserializer::new(reader))
}

/// Convert a document to `serde_json::Value`.
///
/// Binary becomes base64 text and non-finite floats become null, so the
/// conversion back is lossy for both. Opaque payloads are rejected.
pub fn value_to_json(value: &Value) -> Result<serde_json::Value, Error> {
    Ok(match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int32(i) => serde_json::Value::Number((*i).into()),
        Value::Int64(i) => serde_json::Value::Number((*i).into()),
        Value::Float64(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Binary(b) => {
            use base64::Engine;
            serde_json::Value::String(base64::engine::general_purpose::STANDARD.encode(b))
        }
        Value::Opaque(opaque) => {
            return Err(docstream_core::Error::unsupported(opaque.type_name()).into())
        }
        Value::Array(items) => serde_json::Value::Array(
            items
                .iter()
                .map(value_to_json)
                .collect::<Result<_, _>>()?,
        ),
        Value::Object(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), value_to_json(v)?)))
                .collect::<Result<_, Error>>()?,
        ),
    })
}

/// Convert `serde_json::Value` to a document value.
///
/// Integers become `Int32` when they fit and `Int64` otherwise. Unsigned
/// integers past `i64::MAX` and all non-integral numbers become `Float64`.
pub fn json_to_value(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                match i32::try_from(i) {
                    Ok(narrow) => Value::Int32(narrow),
                    Err(_) => Value::Int64(i),
                }
            } else if let Some(f) = n.as_f64() {
                Value::Float64(f)
            } else {
                Value::String(n.to_string())
            }
        }
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(arr) => Value::Array(arr.into_iter().map(json_to_value).collect()),
        serde_json::Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, json_to_value(v)))
                .collect::<Map>(),
        ),
    }
}

/// Parse JSON text into a document value.
pub fn from_json_slice(bytes: &[u8]) -> Result<Value, Error> {
    let json: serde_json::Value = serde_json::from_slice(bytes)?;
    Ok(json_to_value(json))
}

/// Render a document value as JSON text.
pub fn to_json_vec(value: &Value) -> Result<Bytes, Error> {
    let json = value_to_json(value)?;
    Ok(Bytes::from(serde_json::to_vec(&json)?))
}
