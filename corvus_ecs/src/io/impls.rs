use std::convert::TryFrom;
use std::mem::size_of;

use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
use serde_json::Value;

use crate::error::{Error, Result};

use super::{ReadCursor, RemapTable, Serializable, WriteCursor};

// JSON has no non-finite numbers, so those are written as string tokens
const INF_TOKEN: &str = "inf";
const NEG_INF_TOKEN: &str = "-inf";
const NAN_TOKEN: &str = "nan";

fn float_to_tree(v: f64) -> Value {
    if v.is_finite() {
        Value::from(v)
    } else if v.is_nan() {
        Value::from(NAN_TOKEN)
    } else if v > 0.0 {
        Value::from(INF_TOKEN)
    } else {
        Value::from(NEG_INF_TOKEN)
    }
}

fn float_from_tree(node: &Value, expected: &'static str) -> Result<f64> {
    let v = match node {
        Value::Number(n) => n.as_f64(),
        Value::String(token) => match token.as_str() {
            INF_TOKEN => Some(f64::INFINITY),
            NEG_INF_TOKEN => Some(f64::NEG_INFINITY),
            NAN_TOKEN => Some(f64::NAN),
            _ => None,
        },
        _ => None,
    };
    v.ok_or(Error::MalformedTree { expected })
}

macro_rules! impl_unsigned {
    ($($t:ty),*) => {
        $(
            impl Serializable for $t {
                fn binary_size(&self) -> usize {
                    size_of::<$t>()
                }

                fn write_binary(&self, cursor: &mut WriteCursor<'_>, _remap: &RemapTable) -> Result<()> {
                    cursor.write_bytes(&self.to_le_bytes())
                }

                fn read_binary(cursor: &mut ReadCursor<'_>, _remap: &RemapTable) -> Result<Self> {
                    Ok(<$t>::from_le_bytes(cursor.read_array()?))
                }

                fn write_tree(&self, _remap: &RemapTable) -> Result<Value> {
                    Ok(Value::from(*self))
                }

                fn read_tree(node: &Value, _default: Self, _remap: &RemapTable) -> Result<Self> {
                    node.as_u64()
                        .and_then(|v| <$t>::try_from(v).ok())
                        .ok_or(Error::MalformedTree { expected: stringify!($t) })
                }
            }
        )*
    };
}

macro_rules! impl_signed {
    ($($t:ty),*) => {
        $(
            impl Serializable for $t {
                fn binary_size(&self) -> usize {
                    size_of::<$t>()
                }

                fn write_binary(&self, cursor: &mut WriteCursor<'_>, _remap: &RemapTable) -> Result<()> {
                    cursor.write_bytes(&self.to_le_bytes())
                }

                fn read_binary(cursor: &mut ReadCursor<'_>, _remap: &RemapTable) -> Result<Self> {
                    Ok(<$t>::from_le_bytes(cursor.read_array()?))
                }

                fn write_tree(&self, _remap: &RemapTable) -> Result<Value> {
                    Ok(Value::from(*self))
                }

                fn read_tree(node: &Value, _default: Self, _remap: &RemapTable) -> Result<Self> {
                    node.as_i64()
                        .and_then(|v| <$t>::try_from(v).ok())
                        .ok_or(Error::MalformedTree { expected: stringify!($t) })
                }
            }
        )*
    };
}

impl_unsigned!(u8, u16, u32, u64);
impl_signed!(i8, i16, i32, i64);

impl Serializable for f32 {
    fn binary_size(&self) -> usize {
        4
    }

    fn write_binary(&self, cursor: &mut WriteCursor<'_>, _remap: &RemapTable) -> Result<()> {
        cursor.write_bytes(&self.to_le_bytes())
    }

    fn read_binary(cursor: &mut ReadCursor<'_>, _remap: &RemapTable) -> Result<Self> {
        Ok(f32::from_le_bytes(cursor.read_array()?))
    }

    fn write_tree(&self, _remap: &RemapTable) -> Result<Value> {
        Ok(float_to_tree(f64::from(*self)))
    }

    fn read_tree(node: &Value, _default: Self, _remap: &RemapTable) -> Result<Self> {
        float_from_tree(node, "f32").map(|v| v as f32)
    }
}

impl Serializable for f64 {
    fn binary_size(&self) -> usize {
        8
    }

    fn write_binary(&self, cursor: &mut WriteCursor<'_>, _remap: &RemapTable) -> Result<()> {
        cursor.write_bytes(&self.to_le_bytes())
    }

    fn read_binary(cursor: &mut ReadCursor<'_>, _remap: &RemapTable) -> Result<Self> {
        Ok(f64::from_le_bytes(cursor.read_array()?))
    }

    fn write_tree(&self, _remap: &RemapTable) -> Result<Value> {
        Ok(float_to_tree(*self))
    }

    fn read_tree(node: &Value, _default: Self, _remap: &RemapTable) -> Result<Self> {
        float_from_tree(node, "f64")
    }
}

impl Serializable for bool {
    fn binary_size(&self) -> usize {
        1
    }

    fn write_binary(&self, cursor: &mut WriteCursor<'_>, _remap: &RemapTable) -> Result<()> {
        cursor.write_u8(*self as u8)
    }

    fn read_binary(cursor: &mut ReadCursor<'_>, _remap: &RemapTable) -> Result<Self> {
        match cursor.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(Error::InvalidDiscriminant { ty: "bool", value }),
        }
    }

    fn write_tree(&self, _remap: &RemapTable) -> Result<Value> {
        Ok(Value::Bool(*self))
    }

    fn read_tree(node: &Value, _default: Self, _remap: &RemapTable) -> Result<Self> {
        node.as_bool().ok_or(Error::MalformedTree { expected: "bool" })
    }
}

impl Serializable for String {
    fn binary_size(&self) -> usize {
        8 + self.len()
    }

    fn write_binary(&self, cursor: &mut WriteCursor<'_>, _remap: &RemapTable) -> Result<()> {
        cursor.write_len(self.len())?;
        cursor.write_bytes(self.as_bytes())
    }

    fn read_binary(cursor: &mut ReadCursor<'_>, _remap: &RemapTable) -> Result<Self> {
        let len = cursor.read_len()?;
        Ok(String::from_utf8(cursor.read_bytes(len)?.to_vec())?)
    }

    fn write_tree(&self, _remap: &RemapTable) -> Result<Value> {
        Ok(Value::String(self.clone()))
    }

    fn read_tree(node: &Value, _default: Self, _remap: &RemapTable) -> Result<Self> {
        node.as_str()
            .map(str::to_string)
            .ok_or(Error::MalformedTree { expected: "string" })
    }
}

impl<T: Serializable + Default> Serializable for Vec<T> {
    fn binary_size(&self) -> usize {
        8 + self.iter().map(Serializable::binary_size).sum::<usize>()
    }

    fn write_binary(&self, cursor: &mut WriteCursor<'_>, remap: &RemapTable) -> Result<()> {
        cursor.write_len(self.len())?;
        for item in self {
            item.write_binary(cursor, remap)?;
        }
        Ok(())
    }

    fn read_binary(cursor: &mut ReadCursor<'_>, remap: &RemapTable) -> Result<Self> {
        let len = cursor.read_len()?;
        (0..len).map(|_| T::read_binary(cursor, remap)).collect()
    }

    fn write_tree(&self, remap: &RemapTable) -> Result<Value> {
        let items = self
            .iter()
            .map(|item| item.write_tree(remap))
            .collect::<Result<Vec<_>>>()?;
        Ok(Value::Array(items))
    }

    fn read_tree(node: &Value, _default: Self, remap: &RemapTable) -> Result<Self> {
        node.as_array()
            .ok_or(Error::MalformedTree { expected: "array" })?
            .iter()
            .map(|item| T::read_tree(item, T::default(), remap))
            .collect()
    }

    fn intern_resources(&self, remap: &mut RemapTable) {
        for item in self {
            item.intern_resources(remap);
        }
    }
}

/// A discriminant byte (`0` for `None`, `1` for `Some`) followed by the value, if any. `null` in tree form.
impl<T: Serializable + Default> Serializable for Option<T> {
    fn binary_size(&self) -> usize {
        1 + self.as_ref().map_or(0, Serializable::binary_size)
    }

    fn write_binary(&self, cursor: &mut WriteCursor<'_>, remap: &RemapTable) -> Result<()> {
        match self {
            None => cursor.write_u8(0),
            Some(value) => {
                cursor.write_u8(1)?;
                value.write_binary(cursor, remap)
            }
        }
    }

    fn read_binary(cursor: &mut ReadCursor<'_>, remap: &RemapTable) -> Result<Self> {
        match cursor.read_u8()? {
            0 => Ok(None),
            1 => Ok(Some(T::read_binary(cursor, remap)?)),
            value => Err(Error::InvalidDiscriminant { ty: "Option", value }),
        }
    }

    fn write_tree(&self, remap: &RemapTable) -> Result<Value> {
        match self {
            None => Ok(Value::Null),
            Some(value) => value.write_tree(remap),
        }
    }

    fn read_tree(node: &Value, default: Self, remap: &RemapTable) -> Result<Self> {
        if node.is_null() {
            return Ok(None);
        }
        Ok(Some(T::read_tree(node, default.unwrap_or_default(), remap)?))
    }

    fn intern_resources(&self, remap: &mut RemapTable) {
        if let Some(value) = self {
            value.intern_resources(remap);
        }
    }
}

fn read_floats<const N: usize>(node: &Value, expected: &'static str) -> Result<[f32; N]> {
    let items = node.as_array().ok_or(Error::MalformedTree { expected })?;
    if items.len() != N {
        return Err(Error::MalformedTree { expected });
    }

    let mut out = [0.0; N];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = float_from_tree(item, expected)? as f32;
    }
    Ok(out)
}

fn write_floats(cursor: &mut WriteCursor<'_>, floats: &[f32]) -> Result<()> {
    for f in floats {
        cursor.write_bytes(&f.to_le_bytes())?;
    }
    Ok(())
}

fn read_binary_floats<const N: usize>(cursor: &mut ReadCursor<'_>) -> Result<[f32; N]> {
    let mut out = [0.0; N];
    for slot in out.iter_mut() {
        *slot = f32::from_le_bytes(cursor.read_array()?);
    }
    Ok(out)
}

// glam types are written as flat float arrays: `[x, y, z]`, quaternions as `[x, y, z, w]` and matrices column-major
macro_rules! impl_glam {
    ($t:ty, $n:literal, $to:ident, $from:ident) => {
        impl Serializable for $t {
            fn binary_size(&self) -> usize {
                4 * $n
            }

            fn write_binary(&self, cursor: &mut WriteCursor<'_>, _remap: &RemapTable) -> Result<()> {
                write_floats(cursor, &self.$to())
            }

            fn read_binary(cursor: &mut ReadCursor<'_>, _remap: &RemapTable) -> Result<Self> {
                Ok(<$t>::$from(&read_binary_floats::<$n>(cursor)?))
            }

            fn write_tree(&self, _remap: &RemapTable) -> Result<Value> {
                Ok(Value::Array(self.$to().iter().map(|&f| float_to_tree(f64::from(f))).collect()))
            }

            fn read_tree(node: &Value, _default: Self, _remap: &RemapTable) -> Result<Self> {
                Ok(<$t>::$from(&read_floats::<$n>(node, stringify!($t))?))
            }
        }
    };
}

impl_glam!(Vec2, 2, to_array, from_slice);
impl_glam!(Vec3, 3, to_array, from_slice);
impl_glam!(Vec4, 4, to_array, from_slice);
impl_glam!(Quat, 4, to_array, from_slice);
impl_glam!(Mat4, 16, to_cols_array, from_cols_slice);
