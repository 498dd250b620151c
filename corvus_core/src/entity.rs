use std::collections::HashSet;
use std::mem;

use smallvec::SmallVec;

use corvus_ecs::io::{
    element, expect_object, read_count, read_field, Map, ReadCursor, RemapTable, Serializable as _, Value, WriteCursor,
    COUNT_KEY,
};
use corvus_ecs::{Error, Pool, Result, Serializable, Uid, NULL_UID};

use crate::bounds::Aabb;
use crate::component::{AttachSlot, ComponentHandle, ComponentType};
use crate::config::SceneConfig;
use crate::registry::Components;

pub const ENTITY_POOL: &str = "entities";

/// A node of the scene graph.
///
/// Entities own no data besides their name and flags: everything else lives in component pools and is referenced
/// from here by id. The hierarchy is stored twice, as a parent id on the child and an ordered child list on the
/// parent, and `EntityPool` keeps both sides in sync.
#[derive(Serializable, Clone, Debug, PartialEq)]
pub struct Entity {
    pub name: String,
    pub active: bool,
    pub is_static: bool,
    pub(crate) parent: Uid,
    pub(crate) children: Vec<Uid>,
    pub local_bounds: Aabb,
    pub global_bounds: Aabb,

    #[serializable(skip)]
    id: Uid,
    #[serializable(skip)]
    transform: Uid,
    #[serializable(skip)]
    camera: Uid,
    #[serializable(skip)]
    light: Uid,
    #[serializable(skip)]
    geometry: Option<ComponentHandle>,
    #[serializable(skip)]
    others: SmallVec<[ComponentHandle; 4]>,
}

impl Default for Entity {
    fn default() -> Self {
        Entity {
            name: String::new(),
            active: true,
            is_static: false,
            parent: NULL_UID,
            children: Vec::new(),
            local_bounds: Aabb::default(),
            global_bounds: Aabb::default(),

            id: NULL_UID,
            transform: NULL_UID,
            camera: NULL_UID,
            light: NULL_UID,
            geometry: None,
            others: SmallVec::new(),
        }
    }
}

fn swap_slot(slot: &mut Uid, handle: ComponentHandle) -> Option<ComponentHandle> {
    match mem::replace(slot, handle.id) {
        NULL_UID => None,
        old => Some(ComponentHandle::new(old, handle.ty)),
    }
}

fn clear_slot(slot: &mut Uid, id: Uid) -> bool {
    if *slot == id {
        *slot = NULL_UID;
        true
    } else {
        false
    }
}

impl Entity {
    fn named(name: &str, parent: Uid) -> Self {
        Entity {
            name: name.to_string(),
            parent,
            ..Entity::default()
        }
    }

    pub fn id(&self) -> Uid {
        self.id
    }

    /// `0` for top-level entities.
    pub fn parent(&self) -> Uid {
        self.parent
    }

    pub fn children(&self) -> &[Uid] {
        &self.children
    }

    /// `0` until a transform is attached.
    pub fn transform(&self) -> Uid {
        self.transform
    }

    pub fn camera(&self) -> Option<Uid> {
        Some(self.camera).filter(|&id| id != NULL_UID)
    }

    pub fn light(&self) -> Option<Uid> {
        Some(self.light).filter(|&id| id != NULL_UID)
    }

    /// The component that draws this entity, if any.
    pub fn geometry(&self) -> Option<ComponentHandle> {
        self.geometry
    }

    pub fn others(&self) -> &[ComponentHandle] {
        &self.others
    }

    /// Every attached component, transform first.
    pub fn handles(&self) -> Vec<ComponentHandle> {
        let mut handles = Vec::with_capacity(4 + self.others.len());
        if self.transform != NULL_UID {
            handles.push(ComponentHandle::new(self.transform, ComponentType::Transform));
        }
        if self.camera != NULL_UID {
            handles.push(ComponentHandle::new(self.camera, ComponentType::Camera));
        }
        if self.light != NULL_UID {
            handles.push(ComponentHandle::new(self.light, ComponentType::Light));
        }
        handles.extend(self.geometry);
        handles.extend(self.others.iter().copied());
        handles
    }

    /// Records `handle` in the slot its kind goes to. Returns whatever previously occupied a single-occupant slot,
    /// which the caller is responsible for destroying.
    pub(crate) fn attach(&mut self, handle: ComponentHandle) -> Option<ComponentHandle> {
        match handle.ty.slot() {
            AttachSlot::Transform => swap_slot(&mut self.transform, handle),
            AttachSlot::Camera => swap_slot(&mut self.camera, handle),
            AttachSlot::Light => swap_slot(&mut self.light, handle),
            AttachSlot::Geometry => self.geometry.replace(handle),
            AttachSlot::Other => {
                self.others.push(handle);
                None
            }
        }
    }

    /// Forgets `handle`. Returns `false` if this entity did not reference it.
    pub(crate) fn release(&mut self, handle: ComponentHandle) -> bool {
        match handle.ty.slot() {
            AttachSlot::Transform => clear_slot(&mut self.transform, handle.id),
            AttachSlot::Camera => clear_slot(&mut self.camera, handle.id),
            AttachSlot::Light => clear_slot(&mut self.light, handle.id),
            AttachSlot::Geometry => {
                if self.geometry == Some(handle) {
                    self.geometry = None;
                    true
                } else {
                    false
                }
            }
            AttachSlot::Other => match self.others.iter().position(|&h| h == handle) {
                Some(i) => {
                    self.others.remove(i);
                    true
                }
                None => false,
            },
        }
    }
}

/// The pool of every entity in a scene.
pub struct EntityPool {
    pool: Pool<Entity>,
}

impl Default for EntityPool {
    fn default() -> Self {
        EntityPool::new(&SceneConfig::default())
    }
}

impl EntityPool {
    pub fn new(config: &SceneConfig) -> Self {
        EntityPool {
            pool: Pool::with_generator(ENTITY_POOL, config.entity_growth, config.generator(0)),
        }
    }

    /// The entity in the first slot. Only `None` for an empty pool.
    pub fn root_id(&self) -> Option<Uid> {
        self.pool.first_key()
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    pub fn contains(&self, id: Uid) -> bool {
        self.pool.contains(id)
    }

    pub fn get(&self, id: Uid) -> Option<&Entity> {
        self.pool.get(id)
    }

    pub fn get_mut(&mut self, id: Uid) -> Option<&mut Entity> {
        self.pool.get_mut(id)
    }

    pub fn at(&self, id: Uid) -> Result<&Entity> {
        self.pool.at(id)
    }

    pub fn at_mut(&mut self, id: Uid) -> Result<&mut Entity> {
        self.pool.at_mut(id)
    }

    pub fn all_keys(&self) -> Vec<Uid> {
        self.pool.all_keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Uid, &Entity)> {
        self.pool.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (Uid, &mut Entity)> {
        self.pool.iter_mut()
    }

    /// Creates an entity under `parent`. The first entity of a pool becomes its root; after that a `parent` of `0`
    /// means the root.
    pub fn new_entity(&mut self, name: &str, parent: Uid) -> Result<Uid> {
        let parent = match (parent, self.root_id()) {
            (NULL_UID, root) => root.unwrap_or(NULL_UID),
            (parent, _) if self.contains(parent) => parent,
            (parent, _) => return Err(Error::InvalidParent(parent)),
        };

        let id = self.pool.push(Entity::named(name, parent))?;
        self.pool.at_mut(id)?.id = id;
        if parent != NULL_UID {
            self.pool.at_mut(parent)?.children.push(id);
        }

        log::debug!("created entity `{}` {:#x} under {:#x}", name, id, parent);
        Ok(id)
    }

    /// Destroys `id`, its whole subtree and every component attached along the way.
    pub fn destroy(&mut self, components: &mut Components, id: Uid) -> Result<()> {
        let entity = self.at(id)?;
        let parent = entity.parent;
        let children = entity.children.clone();
        let handles = entity.handles();

        for child in children {
            self.destroy(components, child)?;
        }
        for handle in handles {
            components.destroy(self, handle.ty, handle.id)?;
        }

        if let Some(parent) = self.pool.get_mut(parent) {
            parent.children.retain(|&child| child != id);
        }
        self.pool.pop(id)?;

        log::debug!("destroyed entity {:#x}", id);
        Ok(())
    }

    /// Moves `id` under `parent`, appending it to the new parent's children.
    pub fn set_parent(&mut self, id: Uid, parent: Uid) -> Result<()> {
        let old = self.at(id)?.parent;
        if parent == NULL_UID || !self.contains(parent) || self.is_ancestor(id, parent) {
            return Err(Error::InvalidParent(parent));
        }
        if old == parent {
            return Ok(());
        }

        if let Some(old) = self.pool.get_mut(old) {
            old.children.retain(|&child| child != id);
        }
        self.pool.at_mut(parent)?.children.push(id);
        self.pool.at_mut(id)?.parent = parent;
        Ok(())
    }

    /// Whether `ancestor` is `id` itself or sits somewhere above it.
    pub fn is_ancestor(&self, ancestor: Uid, id: Uid) -> bool {
        let mut current = id;
        // A well-formed hierarchy is never deeper than the pool is long
        for _ in 0..=self.len() {
            if current == ancestor {
                return true;
            }
            match self.get(current) {
                Some(entity) if entity.parent != NULL_UID => current = entity.parent,
                _ => return false,
            }
        }
        false
    }

    pub fn find_by_name(&self, name: &str) -> Option<Uid> {
        self.pool.iter().find(|(_, e)| e.name == name).map(|(id, _)| id)
    }

    /// Every entity below `id`, parents before their children.
    pub fn descendants(&self, id: Uid) -> Result<Vec<Uid>> {
        let mut out = Vec::new();
        let mut stack: Vec<Uid> = self.at(id)?.children.iter().rev().copied().collect();

        while let Some(next) = stack.pop() {
            out.push(next);
            if let Some(entity) = self.get(next) {
                stack.extend(entity.children.iter().rev());
            }
        }
        Ok(out)
    }

    pub fn clear(&mut self) {
        self.pool.clear();
    }

    fn insert_loaded(&mut self, id: Uid, mut entity: Entity) -> Result<()> {
        entity.id = id;
        self.pool.insert_with_id(id, entity)
    }

    /// Checks that both sides of every parent/child link agree.
    pub(crate) fn validate_links(&self) -> Result<()> {
        for (id, entity) in self.pool.iter() {
            if entity.parent != NULL_UID {
                let linked = self.get(entity.parent).map_or(false, |p| p.children.contains(&id));
                if !linked {
                    return Err(Error::InvalidParent(entity.parent));
                }
            }
            let mut listed = HashSet::with_capacity(entity.children.len());
            for &child in &entity.children {
                if !listed.insert(child) {
                    return Err(Error::DuplicateChild { parent: id, child });
                }
                if self.get(child).map(|c| c.parent) != Some(id) {
                    return Err(Error::NotFound {
                        id: child,
                        pool: ENTITY_POOL,
                    });
                }
            }
        }

        // Links are mutual by now, so anything a walk down from the top level misses sits on a parent cycle
        let mut reached = HashSet::with_capacity(self.len());
        let mut stack: Vec<Uid> = self
            .pool
            .iter()
            .filter(|(_, e)| e.parent == NULL_UID)
            .map(|(id, _)| id)
            .collect();
        while let Some(id) = stack.pop() {
            if reached.insert(id) {
                stack.extend(self.at(id)?.children.iter().copied());
            }
        }
        if reached.len() != self.len() {
            if let Some((id, _)) = self.pool.iter().find(|(id, _)| !reached.contains(id)) {
                return Err(Error::HierarchyCycle(id));
            }
        }
        Ok(())
    }

    pub(crate) fn binary_size(&self) -> usize {
        8 + self.pool.iter().map(|(_, e)| 8 + e.binary_size()).sum::<usize>()
    }

    pub(crate) fn write_binary(&self, cursor: &mut WriteCursor<'_>, remap: &RemapTable) -> Result<()> {
        cursor.write_len(self.pool.len())?;
        for (id, entity) in self.pool.iter() {
            cursor.write_u64(id)?;
            entity.write_binary(cursor, remap)?;
        }
        Ok(())
    }

    pub(crate) fn read_binary(&mut self, cursor: &mut ReadCursor<'_>, remap: &RemapTable) -> Result<()> {
        let count = cursor.read_len()?;
        for _ in 0..count {
            let id = cursor.read_u64()?;
            let entity = Entity::read_binary(cursor, remap)?;
            self.insert_loaded(id, entity)?;
        }
        Ok(())
    }

    pub(crate) fn write_tree(&self, remap: &RemapTable) -> Result<Value> {
        let mut object = Map::new();
        object.insert(COUNT_KEY.to_string(), Value::from(self.pool.len() as u64));

        for (i, (id, entity)) in self.pool.iter().enumerate() {
            let mut node = Map::new();
            node.insert("id".to_string(), Value::from(id));
            node.insert("entity".to_string(), entity.write_tree(remap)?);
            object.insert(i.to_string(), Value::Object(node));
        }
        Ok(Value::Object(object))
    }

    pub(crate) fn read_tree(&mut self, node: &Value, remap: &RemapTable) -> Result<()> {
        let object = expect_object(node)?;
        for i in 0..read_count(object)? {
            let node = expect_object(element(object, i)?)?;
            let id = node
                .get("id")
                .and_then(Value::as_u64)
                .ok_or(Error::MalformedTree { expected: "entity id" })?;
            let entity = read_field(node, "entity", Entity::default(), remap)?;
            self.insert_loaded(id, entity)?;
        }
        Ok(())
    }
}
