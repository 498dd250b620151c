//! The two persisted forms every stored type supports: a flat little-endian binary blob and a tree document
//! (`serde_json::Value`).
//!
//! Both forms are produced by the same `Serializable` implementation, usually generated with
//! `#[derive(Serializable)]` from the type's field list. Fields that point at external resources go through a
//! `RemapTable` so the persisted form only carries small integers.

use crate::error::{Error, Result};

pub use serde_json::{Map, Value};

pub use cursor::{ReadCursor, WriteCursor};
pub use remap::{RemapTable, ResourceRef};

mod cursor;
mod impls;
mod remap;

/// Key holding the variant name of a serialized enum in tree form.
pub const VARIANT_KEY: &str = "variant";

/// Key holding the number of elements of a pool-like object in tree form. Elements sit under `"0"`, `"1"`, ...
pub const COUNT_KEY: &str = "count";

pub trait Serializable: Sized {
    /// Exact number of bytes `write_binary` will produce.
    fn binary_size(&self) -> usize;

    fn write_binary(&self, cursor: &mut WriteCursor<'_>, remap: &RemapTable) -> Result<()>;

    fn read_binary(cursor: &mut ReadCursor<'_>, remap: &RemapTable) -> Result<Self>;

    fn write_tree(&self, remap: &RemapTable) -> Result<Value>;

    /// Reads a value back from `node`. Anything missing from the node keeps the corresponding part of `default`.
    fn read_tree(node: &Value, default: Self, remap: &RemapTable) -> Result<Self>;

    /// Registers every resource this value refers to. Must run over the whole graph before any `write_*` call.
    fn intern_resources(&self, _remap: &mut RemapTable) {}
}

/// Writes `value` into a buffer of exactly `binary_size` bytes.
pub fn to_bytes<T: Serializable>(value: &T, remap: &RemapTable) -> Result<Vec<u8>> {
    let mut buf = vec![0; value.binary_size()];

    let mut cursor = WriteCursor::new(&mut buf);
    value.write_binary(&mut cursor, remap)?;
    cursor.finish()?;

    Ok(buf)
}

/// Reads a single value that must span the whole of `bytes`.
pub fn from_bytes<T: Serializable>(bytes: &[u8], remap: &RemapTable) -> Result<T> {
    let mut cursor = ReadCursor::new(bytes);
    let value = T::read_binary(&mut cursor, remap)?;

    if !cursor.is_exhausted() {
        return Err(Error::SerializationLengthMismatch {
            expected: cursor.position(),
            actual: bytes.len(),
        });
    }
    Ok(value)
}

pub fn to_tree<T: Serializable>(value: &T, remap: &RemapTable) -> Result<Value> {
    value.write_tree(remap)
}

pub fn from_tree<T: Serializable + Default>(node: &Value, remap: &RemapTable) -> Result<T> {
    T::read_tree(node, T::default(), remap)
}

/// Borrows `node` as an object, the shape every struct is written as.
pub fn expect_object(node: &Value) -> Result<&Map<String, Value>> {
    node.as_object().ok_or(Error::MalformedTree { expected: "object" })
}

/// Reads `key` out of an object node, falling back to `default` when the key is absent.
pub fn read_field<T: Serializable>(
    object: &Map<String, Value>,
    key: &str,
    default: T,
    remap: &RemapTable,
) -> Result<T> {
    match object.get(key) {
        Some(node) => T::read_tree(node, default, remap),
        None => Ok(default),
    }
}

/// Reads the element count of a pool-like object.
pub fn read_count(object: &Map<String, Value>) -> Result<usize> {
    object
        .get(COUNT_KEY)
        .and_then(Value::as_u64)
        .map(|count| count as usize)
        .ok_or(Error::MalformedTree { expected: "element count" })
}

/// Borrows the object stored under `"{index}"` in a pool-like object.
pub fn element(object: &Map<String, Value>, index: usize) -> Result<&Value> {
    object
        .get(&index.to_string())
        .ok_or(Error::MalformedTree { expected: "pool element" })
}

/// Name of the variant stored in an enum node, if the node carries one.
pub fn variant_name(object: &Map<String, Value>) -> Result<Option<&str>> {
    match object.get(VARIANT_KEY) {
        None => Ok(None),
        Some(Value::String(name)) => Ok(Some(name)),
        Some(_) => Err(Error::MalformedTree { expected: "variant name" }),
    }
}

#[cfg(test)]
mod test {
    use glam::Vec3;
    use serde_json::json;

    use crate::test::*;

    use super::*;

    fn comp_y() -> CompY {
        CompY {
            name: "lamp".to_string(),
            shape: Shape::Sphere { radius: 2.5 },
            texture: Some(ResourceRef::new("textures/lamp.png")),
            extra: vec![ResourceRef::new("a"), ResourceRef::new("textures/lamp.png")],
            cached: 99,
        }
    }

    fn interned(value: &CompY) -> RemapTable {
        let mut remap = RemapTable::new();
        value.intern_resources(&mut remap);
        remap
    }

    #[test]
    fn intern_pass_collects_every_resource_once() {
        let remap = interned(&comp_y());

        assert_eq!(remap.len(), 2);
        assert_eq!(remap.index_of(&ResourceRef::new("textures/lamp.png")).unwrap(), 0);
        assert_eq!(remap.index_of(&ResourceRef::new("a")).unwrap(), 1);
    }

    #[test]
    fn struct_binary_round_trip_drops_skipped() {
        let value = comp_y();
        let remap = interned(&value);

        let bytes = to_bytes(&value, &remap).unwrap();
        assert_eq!(bytes.len(), value.binary_size());

        let read: CompY = from_bytes(&bytes, &remap).unwrap();
        assert_eq!(read, CompY { cached: 0, ..value });
    }

    #[test]
    fn struct_tree_layout() {
        let value = comp_y();
        let remap = interned(&value);

        assert_eq!(
            value.write_tree(&remap).unwrap(),
            json!({
                "name": "lamp",
                "shape": {"variant": "Sphere", "radius": 2.5},
                "texture": 0,
                "extra": [1, 0],
            })
        );
    }

    #[test]
    fn struct_tree_round_trip_keeps_default_for_skipped() {
        let value = comp_y();
        let remap = interned(&value);

        let tree = value.write_tree(&remap).unwrap();
        let default = CompY { cached: 7, ..CompY::default() };

        let read = CompY::read_tree(&tree, default, &remap).unwrap();
        assert_eq!(read, CompY { cached: 7, ..value });
    }

    #[test]
    fn missing_keys_keep_defaults() {
        let remap = RemapTable::new();
        let default = CompY {
            name: "fallback".to_string(),
            shape: Shape::Box(Vec3::ONE),
            ..CompY::default()
        };

        let read = CompY::read_tree(&json!({"shape": {"variant": "Point"}}), default.clone(), &remap).unwrap();
        assert_eq!(read, CompY { shape: Shape::Point, ..default.clone() });

        let read = CompY::read_tree(&json!({}), default.clone(), &remap).unwrap();
        assert_eq!(read, default);
    }

    #[test]
    fn enum_sizes_branch_per_variant() {
        let remap = RemapTable::new();

        for shape in vec![Shape::Point, Shape::Sphere { radius: 1.0 }, Shape::Box(Vec3::new(1.0, 2.0, 3.0))] {
            let bytes = to_bytes(&shape, &remap).unwrap();
            assert_eq!(bytes.len(), shape.binary_size());
            assert_eq!(from_bytes::<Shape>(&bytes, &remap).unwrap(), shape);
        }

        assert_eq!(Shape::Point.binary_size(), 1);
        assert_eq!(Shape::Sphere { radius: 1.0 }.binary_size(), 5);
        assert_eq!(Shape::Box(Vec3::ZERO).binary_size(), 13);
    }

    #[test]
    fn enum_tree_partial_variant() {
        let remap = RemapTable::new();

        // Same variant as the default: missing fields come from the default
        let read = Shape::read_tree(&json!({"variant": "Sphere"}), Shape::Sphere { radius: 4.0 }, &remap).unwrap();
        assert_eq!(read, Shape::Sphere { radius: 4.0 });

        // Different variant: missing fields come from `Default`
        let read = Shape::read_tree(&json!({"variant": "Box"}), Shape::Point, &remap).unwrap();
        assert_eq!(read, Shape::Box(Vec3::ZERO));

        let read = Shape::read_tree(&json!({"variant": "Box", "0": [1.0, 1.0, 1.0]}), Shape::Point, &remap).unwrap();
        assert_eq!(read, Shape::Box(Vec3::ONE));
    }

    #[test]
    fn enum_bad_inputs() {
        let remap = RemapTable::new();

        assert!(matches!(
            Shape::read_tree(&json!({"variant": "Torus"}), Shape::Point, &remap),
            Err(Error::UnknownVariant { ty: "Shape", .. })
        ));
        assert!(matches!(
            from_bytes::<Shape>(&[9], &remap),
            Err(Error::InvalidDiscriminant { ty: "Shape", value: 9 })
        ));
    }

    #[test]
    fn tuple_struct() {
        let remap = RemapTable::new();
        let pair = Pair(3, -40);

        assert_eq!(pair.write_tree(&remap).unwrap(), json!({"0": 3, "1": -40}));
        assert_eq!(from_tree::<Pair>(&json!({"1": 5}), &remap).unwrap(), Pair(0, 5));
        assert_eq!(from_bytes::<Pair>(&to_bytes(&pair, &remap).unwrap(), &remap).unwrap(), pair);
    }

    #[test]
    fn writing_uninterned_resource_fails() {
        let value = comp_y();

        assert!(matches!(to_bytes(&value, &RemapTable::new()), Err(Error::UnknownResource(_))));
        assert!(matches!(value.write_tree(&RemapTable::new()), Err(Error::UnknownResource(_))));
    }

    #[test]
    fn trailing_bytes_rejected() {
        let remap = RemapTable::new();
        let mut bytes = to_bytes(&Pair(1, 2), &remap).unwrap();
        bytes.push(0);

        assert!(matches!(from_bytes::<Pair>(&bytes, &remap), Err(Error::SerializationLengthMismatch { .. })));
    }

    #[test]
    fn non_object_struct_node() {
        let remap = RemapTable::new();

        assert!(matches!(
            CompX::read_tree(&json!([1, 2]), CompX::default(), &remap),
            Err(Error::MalformedTree { expected: "object" })
        ));
    }
}
