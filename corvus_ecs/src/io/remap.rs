use std::collections::HashMap;
use std::fmt;

use serde_json::{Map, Value};

use crate::error::{Error, Result};

use super::{element, expect_object, read_count, ReadCursor, Serializable, WriteCursor, COUNT_KEY};

/// Identifier of a resource owned by someone else (a mesh, shader or texture path).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceRef(pub String);

impl ResourceRef {
    pub fn new<S: Into<String>>(s: S) -> Self {
        ResourceRef(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceRef {
    fn from(s: &str) -> Self {
        ResourceRef::new(s)
    }
}

/// Bidirectional map between resource identifiers and the compact integers that stand in for them inside one
/// persisted document.
///
/// Built fresh for every save or load. On save, `intern` runs over the whole graph first, the table is written at
/// the head of the document and only then are the components written, looking their resources up with
/// `index_of`. On load, the table is read first and components resolve their integers with `resolve`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemapTable {
    by_index: Vec<ResourceRef>,
    by_resource: HashMap<ResourceRef, u32>,
}

impl RemapTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table that already knows some resources, in the given order.
    pub fn seeded<I: IntoIterator<Item = ResourceRef>>(resources: I) -> Self {
        let mut table = Self::new();
        for resource in resources {
            table.intern(&resource);
        }
        table
    }

    pub fn len(&self) -> usize {
        self.by_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_index.is_empty()
    }

    pub fn intern(&mut self, resource: &ResourceRef) -> u32 {
        if let Some(&index) = self.by_resource.get(resource) {
            return index;
        }

        let index = self.by_index.len() as u32;
        self.by_index.push(resource.clone());
        self.by_resource.insert(resource.clone(), index);
        index
    }

    /// Appends an entry read from a saved table, where every resource must appear once.
    fn push_loaded(&mut self, resource: ResourceRef) -> Result<()> {
        if self.by_resource.contains_key(&resource) {
            return Err(Error::DuplicateResource(resource.0));
        }
        self.intern(&resource);
        Ok(())
    }

    pub fn index_of(&self, resource: &ResourceRef) -> Result<u32> {
        self.by_resource
            .get(resource)
            .copied()
            .ok_or_else(|| Error::UnknownResource(resource.0.clone()))
    }

    pub fn resolve(&self, index: u32) -> Result<&ResourceRef> {
        self.by_index.get(index as usize).ok_or(Error::ResourceIndexOutOfRange {
            index,
            len: self.by_index.len(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceRef> {
        self.by_index.iter()
    }

    pub fn binary_size(&self) -> usize {
        8 + self.by_index.iter().map(|r| r.0.binary_size()).sum::<usize>()
    }

    pub fn write_binary(&self, cursor: &mut WriteCursor<'_>) -> Result<()> {
        cursor.write_len(self.by_index.len())?;
        for resource in &self.by_index {
            resource.0.write_binary(cursor, self)?;
        }
        Ok(())
    }

    pub fn read_binary(cursor: &mut ReadCursor<'_>) -> Result<Self> {
        let mut table = Self::new();

        let count = cursor.read_len()?;
        for _ in 0..count {
            let resource = ResourceRef(String::read_binary(cursor, &table)?);
            table.push_loaded(resource)?;
        }

        Ok(table)
    }

    pub fn write_tree(&self) -> Value {
        let mut object = Map::new();
        object.insert(COUNT_KEY.to_string(), Value::from(self.by_index.len() as u64));
        for (i, resource) in self.by_index.iter().enumerate() {
            object.insert(i.to_string(), Value::String(resource.0.clone()));
        }
        Value::Object(object)
    }

    pub fn read_tree(node: &Value) -> Result<Self> {
        let object = expect_object(node)?;
        let count = read_count(object)?;

        let mut table = Self::new();
        for i in 0..count {
            let resource = element(object, i)?
                .as_str()
                .ok_or(Error::MalformedTree { expected: "resource identifier" })?;
            table.push_loaded(ResourceRef::new(resource))?;
        }

        Ok(table)
    }
}

impl Serializable for ResourceRef {
    fn binary_size(&self) -> usize {
        4
    }

    fn write_binary(&self, cursor: &mut WriteCursor<'_>, remap: &RemapTable) -> Result<()> {
        cursor.write_u32(remap.index_of(self)?)
    }

    fn read_binary(cursor: &mut ReadCursor<'_>, remap: &RemapTable) -> Result<Self> {
        let index = cursor.read_u32()?;
        remap.resolve(index).map(Clone::clone)
    }

    fn write_tree(&self, remap: &RemapTable) -> Result<Value> {
        Ok(Value::from(remap.index_of(self)?))
    }

    fn read_tree(node: &Value, _default: Self, remap: &RemapTable) -> Result<Self> {
        let index = node
            .as_u64()
            .filter(|&i| i <= u64::from(u32::MAX))
            .ok_or(Error::MalformedTree { expected: "resource index" })?;
        remap.resolve(index as u32).map(Clone::clone)
    }

    fn intern_resources(&self, remap: &mut RemapTable) {
        remap.intern(self);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::io::{from_bytes, to_bytes};

    #[test]
    fn intern_twice_same_index() {
        let mut table = RemapTable::new();

        let a = table.intern(&ResourceRef::new("meshes/cube.mesh"));
        let b = table.intern(&ResourceRef::new("meshes/cube.mesh"));

        assert_eq!(a, b);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn indices_are_dense() {
        let mut table = RemapTable::new();

        assert_eq!(table.intern(&"a".into()), 0);
        assert_eq!(table.intern(&"b".into()), 1);
        assert_eq!(table.intern(&"a".into()), 0);
        assert_eq!(table.intern(&"c".into()), 2);

        assert_eq!(table.resolve(1).unwrap(), &ResourceRef::new("b"));
    }

    #[test]
    fn seeded_keeps_order() {
        let table = RemapTable::seeded(vec!["x".into(), "y".into()]);

        assert_eq!(table.index_of(&"x".into()).unwrap(), 0);
        assert_eq!(table.index_of(&"y".into()).unwrap(), 1);
    }

    #[test]
    fn unknown_lookups() {
        let table = RemapTable::new();

        assert!(matches!(table.index_of(&"nope".into()), Err(Error::UnknownResource(_))));
        assert!(matches!(table.resolve(3), Err(Error::ResourceIndexOutOfRange { index: 3, len: 0 })));
    }

    #[test]
    fn resource_ref_goes_through_table() {
        let table = RemapTable::seeded(vec!["shaders/standard.glsl".into()]);
        let r = ResourceRef::new("shaders/standard.glsl");

        let bytes = to_bytes(&r, &table).unwrap();
        assert_eq!(bytes, 0u32.to_le_bytes());
        assert_eq!(from_bytes::<ResourceRef>(&bytes, &table).unwrap(), r);

        assert_eq!(r.write_tree(&table).unwrap(), Value::from(0));
    }

    #[test]
    fn table_binary() {
        let table = RemapTable::seeded(vec!["a".into(), "textures/b.png".into()]);

        let mut buf = vec![0; table.binary_size()];
        let mut cursor = WriteCursor::new(&mut buf);
        table.write_binary(&mut cursor).unwrap();
        cursor.finish().unwrap();

        let read = RemapTable::read_binary(&mut ReadCursor::new(&buf)).unwrap();
        assert_eq!(read, table);
    }

    #[test]
    fn table_tree() {
        let table = RemapTable::seeded(vec!["a".into(), "b".into()]);

        let tree = table.write_tree();
        assert_eq!(tree, serde_json::json!({"count": 2, "0": "a", "1": "b"}));
        assert_eq!(RemapTable::read_tree(&tree).unwrap(), table);
    }

    #[test]
    fn repeated_entries_rejected() {
        let tree = serde_json::json!({"count": 3, "0": "a", "1": "b", "2": "a"});
        assert!(matches!(RemapTable::read_tree(&tree), Err(Error::DuplicateResource(r)) if r == "a"));

        let mut buf = Vec::new();
        buf.extend_from_slice(&2u64.to_le_bytes());
        for _ in 0..2 {
            buf.extend_from_slice(&1u64.to_le_bytes());
            buf.push(b'x');
        }
        assert!(matches!(
            RemapTable::read_binary(&mut ReadCursor::new(&buf)),
            Err(Error::DuplicateResource(r)) if r == "x"
        ));
    }
}
