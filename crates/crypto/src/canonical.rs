//! Deterministic JSON serialization.
//!
//! Object keys are emitted in sorted order at every nesting level and no
//! whitespace is produced, independent of how `serde_json` is configured
//! elsewhere in the dependency graph.

use crate::error::CodecResult;
use serde::ser::{self, Error as _};
use serde::Serialize;
use serde_json::Value;

/// Serialize `value` into canonical JSON bytes.
///
/// Fails on NaN or infinite floats. JSON has no encoding for them and
/// `serde_json` would silently write `null`.
pub fn to_canonical_json<T: Serialize + ?Sized>(value: &T) -> CodecResult<Vec<u8>> {
    value.serialize(FiniteCheck)?;
    let value = serde_json::to_value(value)?;
    let mut out = Vec::new();
    write_canonical(&value, &mut out)?;
    Ok(out)
}

fn write_canonical(value: &Value, out: &mut Vec<u8>) -> CodecResult<()> {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            out.push(b'{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                serde_json::to_writer(&mut *out, key)?;
                out.push(b':');
                write_canonical(item, out)?;
            }
            out.push(b'}');
        }
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical(item, out)?;
            }
            out.push(b']');
        }
        scalar => serde_json::to_writer(&mut *out, scalar)?,
    }
    Ok(())
}

/// Serializer that only walks a value looking for non-finite floats.
#[derive(Clone, Copy)]
struct FiniteCheck;

type CheckResult = Result<(), serde_json::Error>;

macro_rules! accept_scalars {
    ($($method:ident: $ty:ty),* $(,)?) => {
        $(
            fn $method(self, _v: $ty) -> CheckResult {
                Ok(())
            }
        )*
    };
}

impl ser::Serializer for FiniteCheck {
    type Ok = ();
    type Error = serde_json::Error;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    accept_scalars! {
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
        serialize_bytes: &[u8],
    }

    fn serialize_f32(self, v: f32) -> CheckResult {
        self.serialize_f64(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> CheckResult {
        if v.is_finite() {
            Ok(())
        } else {
            Err(serde_json::Error::custom(format!(
                "non-finite float {} has no JSON encoding",
                v
            )))
        }
    }

    fn serialize_none(self) -> CheckResult {
        Ok(())
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> CheckResult {
        value.serialize(self)
    }

    fn serialize_unit(self) -> CheckResult {
        Ok(())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> CheckResult {
        Ok(())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
    ) -> CheckResult {
        Ok(())
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> CheckResult {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        value: &T,
    ) -> CheckResult {
        value.serialize(self)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self, serde_json::Error> {
        Ok(self)
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self, serde_json::Error> {
        Ok(self)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self, serde_json::Error> {
        Ok(self)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self, serde_json::Error> {
        Ok(self)
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self, serde_json::Error> {
        Ok(self)
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self, serde_json::Error> {
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self, serde_json::Error> {
        Ok(self)
    }
}

macro_rules! walk_elements {
    ($($trait:ident :: $method:ident),* $(,)?) => {
        $(
            impl ser::$trait for FiniteCheck {
                type Ok = ();
                type Error = serde_json::Error;

                fn $method<T: ?Sized + Serialize>(&mut self, value: &T) -> CheckResult {
                    value.serialize(*self)
                }

                fn end(self) -> CheckResult {
                    Ok(())
                }
            }
        )*
    };
}

walk_elements! {
    SerializeSeq::serialize_element,
    SerializeTuple::serialize_element,
    SerializeTupleStruct::serialize_field,
    SerializeTupleVariant::serialize_field,
}

macro_rules! walk_fields {
    ($($trait:ident),* $(,)?) => {
        $(
            impl ser::$trait for FiniteCheck {
                type Ok = ();
                type Error = serde_json::Error;

                fn serialize_field<T: ?Sized + Serialize>(
                    &mut self,
                    _key: &'static str,
                    value: &T,
                ) -> CheckResult {
                    value.serialize(*self)
                }

                fn end(self) -> CheckResult {
                    Ok(())
                }
            }
        )*
    };
}

walk_fields! {
    SerializeStruct,
    SerializeStructVariant,
}

impl ser::SerializeMap for FiniteCheck {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> CheckResult {
        key.serialize(*self)
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> CheckResult {
        value.serialize(*self)
    }

    fn end(self) -> CheckResult {
        Ok(())
    }
}
