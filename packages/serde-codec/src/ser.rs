//! A serde `Serializer` emitting token calls into a `DocumentWriter`.
//!
//! Integers are written at the narrowest width that holds every value of
//! the source type: `i8` through `u16` as 32-bit, `i64` and `u32` as
//! 64-bit. Wider unsigned values are checked and rejected once they leave
//! the signed 64-bit range. Enums use the externally tagged layout, so a
//! newtype variant `Shape::Circle(2.0)` becomes `{"Circle": 2.0}`.

use serde::ser::{self, Impossible, Serialize};

use docstream_core::DocumentWriter;

use crate::Error;

/// Serializes Rust values as token calls on a writer.
pub struct Serializer<'w> {
    writer: &'w mut DocumentWriter,
}

impl<'w> Serializer<'w> {
    pub fn new(writer: &'w mut DocumentWriter) -> Self {
        Self { writer }
    }
}

fn checked_i64<T>(value: T) -> Result<i64, Error>
where
    T: Copy + ToString + TryInto<i64>,
{
    value
        .try_into()
        .map_err(|_| docstream_core::Error::overflow(value, "i64").into())
}

impl<'a, 'w> ser::Serializer for &'a mut Serializer<'w> {
    type Ok = ();
    type Error = Error;

    type SerializeSeq = Compound<'a, 'w>;
    type SerializeTuple = Compound<'a, 'w>;
    type SerializeTupleStruct = Compound<'a, 'w>;
    type SerializeTupleVariant = Compound<'a, 'w>;
    type SerializeMap = Compound<'a, 'w>;
    type SerializeStruct = Compound<'a, 'w>;
    type SerializeStructVariant = Compound<'a, 'w>;

    fn serialize_bool(self, v: bool) -> Result<(), Error> {
        Ok(self.writer.write_bool(v)?)
    }

    fn serialize_i8(self, v: i8) -> Result<(), Error> {
        Ok(self.writer.write_i32(v.into())?)
    }

    fn serialize_i16(self, v: i16) -> Result<(), Error> {
        Ok(self.writer.write_i32(v.into())?)
    }

    fn serialize_i32(self, v: i32) -> Result<(), Error> {
        Ok(self.writer.write_i32(v)?)
    }

    fn serialize_i64(self, v: i64) -> Result<(), Error> {
        Ok(self.writer.write_i64(v)?)
    }

    fn serialize_i128(self, v: i128) -> Result<(), Error> {
        let v = checked_i64(v)?;
        Ok(self.writer.write_i64(v)?)
    }

    fn serialize_u8(self, v: u8) -> Result<(), Error> {
        Ok(self.writer.write_i32(v.into())?)
    }

    fn serialize_u16(self, v: u16) -> Result<(), Error> {
        Ok(self.writer.write_i32(v.into())?)
    }

    fn serialize_u32(self, v: u32) -> Result<(), Error> {
        Ok(self.writer.write_i64(v.into())?)
    }

    fn serialize_u64(self, v: u64) -> Result<(), Error> {
        let v = checked_i64(v)?;
        Ok(self.writer.write_i64(v)?)
    }

    fn serialize_u128(self, v: u128) -> Result<(), Error> {
        let v = checked_i64(v)?;
        Ok(self.writer.write_i64(v)?)
    }

    fn serialize_f32(self, v: f32) -> Result<(), Error> {
        Ok(self.writer.write_f64(v.into())?)
    }

    fn serialize_f64(self, v: f64) -> Result<(), Error> {
        Ok(self.writer.write_f64(v)?)
    }

    fn serialize_char(self, v: char) -> Result<(), Error> {
        Ok(self.writer.write_string(v.to_string())?)
    }

    fn serialize_str(self, v: &str) -> Result<(), Error> {
        Ok(self.writer.write_string(v)?)
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<(), Error> {
        Ok(self.writer.write_binary(v)?)
    }

    fn serialize_none(self) -> Result<(), Error> {
        Ok(self.writer.write_null()?)
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<(), Error> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<(), Error> {
        Ok(self.writer.write_null()?)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<(), Error> {
        self.serialize_unit()
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<(), Error> {
        self.serialize_str(variant)
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<(), Error> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<(), Error> {
        self.writer.write_start_object()?;
        self.writer.write_field_name(variant)?;
        value.serialize(&mut *self)?;
        Ok(self.writer.write_end_object()?)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Compound<'a, 'w>, Error> {
        self.writer.write_start_array()?;
        Ok(Compound::new(self, Close::Array))
    }

    fn serialize_tuple(self, len: usize) -> Result<Compound<'a, 'w>, Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Compound<'a, 'w>, Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Compound<'a, 'w>, Error> {
        self.writer.write_start_object()?;
        self.writer.write_field_name(variant)?;
        self.writer.write_start_array()?;
        Ok(Compound::new(self, Close::ArrayInVariant))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Compound<'a, 'w>, Error> {
        self.writer.write_start_object()?;
        Ok(Compound::new(self, Close::Object))
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<Compound<'a, 'w>, Error> {
        self.serialize_map(Some(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Compound<'a, 'w>, Error> {
        self.writer.write_start_object()?;
        self.writer.write_field_name(variant)?;
        self.writer.write_start_object()?;
        Ok(Compound::new(self, Close::ObjectInVariant))
    }
}

/// What `end()` has to close.
#[derive(Debug, Clone, Copy)]
enum Close {
    Array,
    Object,
    ArrayInVariant,
    ObjectInVariant,
}

#[doc(hidden)]
pub struct Compound<'a, 'w> {
    ser: &'a mut Serializer<'w>,
    close: Close,
}

impl<'a, 'w> Compound<'a, 'w> {
    fn new(ser: &'a mut Serializer<'w>, close: Close) -> Self {
        Self { ser, close }
    }

    fn element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        value.serialize(&mut *self.ser)
    }

    fn field<T: ?Sized + Serialize>(&mut self, key: &'static str, value: &T) -> Result<(), Error> {
        self.ser.writer.write_field_name(key)?;
        value.serialize(&mut *self.ser)
    }

    fn finish(self) -> Result<(), Error> {
        let writer = &mut *self.ser.writer;
        match self.close {
            Close::Array => writer.write_end_array()?,
            Close::Object => writer.write_end_object()?,
            Close::ArrayInVariant => {
                writer.write_end_array()?;
                writer.write_end_object()?;
            }
            Close::ObjectInVariant => {
                writer.write_end_object()?;
                writer.write_end_object()?;
            }
        }
        Ok(())
    }
}

impl ser::SerializeSeq for Compound<'_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        self.element(value)
    }

    fn end(self) -> Result<(), Error> {
        self.finish()
    }
}

impl ser::SerializeTuple for Compound<'_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        self.element(value)
    }

    fn end(self) -> Result<(), Error> {
        self.finish()
    }
}

impl ser::SerializeTupleStruct for Compound<'_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        self.element(value)
    }

    fn end(self) -> Result<(), Error> {
        self.finish()
    }
}

impl ser::SerializeTupleVariant for Compound<'_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        self.element(value)
    }

    fn end(self) -> Result<(), Error> {
        self.finish()
    }
}

impl ser::SerializeMap for Compound<'_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<(), Error> {
        key.serialize(MapKeySerializer {
            writer: &mut *self.ser.writer,
        })
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        self.element(value)
    }

    fn end(self) -> Result<(), Error> {
        self.finish()
    }
}

impl ser::SerializeStruct for Compound<'_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), Error> {
        self.field(key, value)
    }

    fn end(self) -> Result<(), Error> {
        self.finish()
    }
}

impl ser::SerializeStructVariant for Compound<'_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), Error> {
        self.field(key, value)
    }

    fn end(self) -> Result<(), Error> {
        self.finish()
    }
}

/// Writes a map key as a field name. Strings, chars, booleans and
/// integers are accepted; anything else cannot name an object member.
struct MapKeySerializer<'w> {
    writer: &'w mut DocumentWriter,
}

fn key_must_be_a_string(found: &str) -> Error {
    Error::Message(format!("map key must be a string, found {}", found))
}

macro_rules! serialize_key_display {
    ($($method:ident: $ty:ty),* $(,)?) => {
        $(
            fn $method(self, v: $ty) -> Result<(), Error> {
                Ok(self.writer.write_field_name(v.to_string())?)
            }
        )*
    };
}

impl ser::Serializer for MapKeySerializer<'_> {
    type Ok = ();
    type Error = Error;

    type SerializeSeq = Impossible<(), Error>;
    type SerializeTuple = Impossible<(), Error>;
    type SerializeTupleStruct = Impossible<(), Error>;
    type SerializeTupleVariant = Impossible<(), Error>;
    type SerializeMap = Impossible<(), Error>;
    type SerializeStruct = Impossible<(), Error>;
    type SerializeStructVariant = Impossible<(), Error>;

    serialize_key_display! {
        serialize_bool: bool,
        serialize_i8: i8,
        serialize_i16: i16,
        serialize_i32: i32,
        serialize_i64: i64,
        serialize_i128: i128,
        serialize_u8: u8,
        serialize_u16: u16,
        serialize_u32: u32,
        serialize_u64: u64,
        serialize_u128: u128,
        serialize_char: char,
        serialize_str: &str,
    }

    fn serialize_f32(self, _v: f32) -> Result<(), Error> {
        Err(key_must_be_a_string("f32"))
    }

    fn serialize_f64(self, _v: f64) -> Result<(), Error> {
        Err(key_must_be_a_string("f64"))
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<(), Error> {
        Err(key_must_be_a_string("bytes"))
    }

    fn serialize_none(self) -> Result<(), Error> {
        Err(key_must_be_a_string("none"))
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<(), Error> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<(), Error> {
        Err(key_must_be_a_string("unit"))
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<(), Error> {
        Err(key_must_be_a_string(name))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<(), Error> {
        Ok(self.writer.write_field_name(variant)?)
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<(), Error> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<(), Error> {
        Err(key_must_be_a_string(name))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, Error> {
        Err(key_must_be_a_string("sequence"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, Error> {
        Err(key_must_be_a_string("tuple"))
    }

    fn serialize_tuple_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, Error> {
        Err(key_must_be_a_string(name))
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, Error> {
        Err(key_must_be_a_string(name))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, Error> {
        Err(key_must_be_a_string("map"))
    }

    fn serialize_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, Error> {
        Err(key_must_be_a_string(name))
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, Error> {
        Err(key_must_be_a_string(name))
    }
}
