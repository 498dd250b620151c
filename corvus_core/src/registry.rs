//! One pool per component kind, all generated from the table at the bottom of this file.
//!
//! Adding a component kind means adding one line to that table (plus its `AttachSlot` in `component`): the
//! `ComponentType` tag, the pool field, the `ComponentRef`/`ComponentMut` views and every dispatch `match` below
//! are derived from it, so none of them can go out of sync.

use std::collections::VecDeque;

use glam::Mat4;

use corvus_ecs::io::{
    element, expect_object, read_count, read_field, Map, ReadCursor, RemapTable, Serializable, Value, WriteCursor,
    COUNT_KEY,
};
use corvus_ecs::{Error, Pool, Result, Uid, NULL_UID};

use crate::component::*;
use crate::config::SceneConfig;
use crate::entity::{EntityPool, ENTITY_POOL};

/// A component payload type with its own pool in `Components`.
pub trait Component: Serializable + Clone + Default + 'static {
    const TYPE: ComponentType;

    fn pool(components: &Components) -> &Pool<Attached<Self>>;

    fn pool_mut(components: &mut Components) -> &mut Pool<Attached<Self>>;
}

macro_rules! components {
    ($($kind:ident => $field:ident),* $(,)?) => {
        /// Tag naming a component kind, and therefore the pool it lives in.
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
        pub enum ComponentType {
            $($kind,)*
        }

        impl ComponentType {
            /// Every kind, in the order pools are persisted.
            pub const ALL: &'static [ComponentType] = &[$(ComponentType::$kind,)*];

            pub fn pool_name(self) -> &'static str {
                match self {
                    $(ComponentType::$kind => stringify!($field),)*
                }
            }
        }

        /// Borrowed view of a component of any kind.
        #[derive(Debug, Clone, Copy)]
        pub enum ComponentRef<'a> {
            $($kind(&'a Attached<$kind>),)*
        }

        impl ComponentRef<'_> {
            pub fn id(&self) -> Uid {
                match self {
                    $(ComponentRef::$kind(c) => c.id(),)*
                }
            }

            pub fn owner(&self) -> Uid {
                match self {
                    $(ComponentRef::$kind(c) => c.owner(),)*
                }
            }

            pub fn component_type(&self) -> ComponentType {
                match self {
                    $(ComponentRef::$kind(_) => ComponentType::$kind,)*
                }
            }
        }

        /// Mutably borrowed view of a component of any kind.
        #[derive(Debug)]
        pub enum ComponentMut<'a> {
            $($kind(&'a mut Attached<$kind>),)*
        }

        impl ComponentMut<'_> {
            pub fn id(&self) -> Uid {
                match self {
                    $(ComponentMut::$kind(c) => c.id(),)*
                }
            }

            pub fn owner(&self) -> Uid {
                match self {
                    $(ComponentMut::$kind(c) => c.owner(),)*
                }
            }

            pub fn component_type(&self) -> ComponentType {
                match self {
                    $(ComponentMut::$kind(_) => ComponentType::$kind,)*
                }
            }
        }

        $(
            impl Component for $kind {
                const TYPE: ComponentType = ComponentType::$kind;

                fn pool(components: &Components) -> &Pool<Attached<Self>> {
                    &components.$field
                }

                fn pool_mut(components: &mut Components) -> &mut Pool<Attached<Self>> {
                    &mut components.$field
                }
            }
        )*

        /// Every component of a scene, one pool per kind.
        pub struct Components {
            $($field: Pool<Attached<$kind>>,)*
        }

        impl Components {
            pub fn new(config: &SceneConfig) -> Self {
                Components {
                    $($field: Pool::with_generator(
                        stringify!($field),
                        config.component_growth,
                        config.generator(ComponentType::$kind as u64 + 1),
                    ),)*
                }
            }

            pub fn contains(&self, ty: ComponentType, id: Uid) -> bool {
                match ty {
                    $(ComponentType::$kind => self.$field.contains(id),)*
                }
            }

            pub fn len(&self, ty: ComponentType) -> usize {
                match ty {
                    $(ComponentType::$kind => self.$field.len(),)*
                }
            }

            pub fn get(&self, id: Uid, ty: ComponentType) -> Result<ComponentRef<'_>> {
                match ty {
                    $(ComponentType::$kind => self.get_typed::<$kind>(id).map(ComponentRef::$kind),)*
                }
            }

            pub fn get_mut(&mut self, id: Uid, ty: ComponentType) -> Result<ComponentMut<'_>> {
                match ty {
                    $(ComponentType::$kind => self.get_typed_mut::<$kind>(id).map(ComponentMut::$kind),)*
                }
            }

            /// Creates a default component of kind `ty` on `owner`.
            pub fn create(
                &mut self,
                entities: &mut EntityPool,
                ty: ComponentType,
                owner: Uid,
            ) -> Result<(Uid, ComponentMut<'_>)> {
                match ty {
                    $(ComponentType::$kind => self
                        .create_typed::<$kind>(entities, owner)
                        .map(|(id, c)| (id, ComponentMut::$kind(c))),)*
                }
            }

            /// Attaches a deep copy of component `source` to `owner`. The copy gets a fresh id.
            pub fn copy(&mut self, entities: &mut EntityPool, owner: Uid, ty: ComponentType, source: Uid) -> Result<Uid> {
                match ty {
                    $(ComponentType::$kind => self.copy_typed::<$kind>(entities, owner, source),)*
                }
            }

            pub fn all_of_type(&self, ty: ComponentType) -> Vec<(Uid, ComponentRef<'_>)> {
                match ty {
                    $(ComponentType::$kind => self.$field.iter().map(|(id, c)| (id, ComponentRef::$kind(c))).collect(),)*
                }
            }

            pub fn total_len(&self) -> usize {
                0 $(+ self.$field.len())*
            }

            pub fn clear(&mut self) {
                $(self.$field.clear();)*
            }

            fn pop(&mut self, ty: ComponentType, id: Uid) -> Result<()> {
                match ty {
                    $(ComponentType::$kind => self.$field.pop(id).map(drop),)*
                }
            }

            pub(crate) fn intern_resources(&self, remap: &mut RemapTable) {
                $(
                    for (_, c) in self.$field.iter() {
                        c.value.intern_resources(remap);
                    }
                )*
            }

            pub(crate) fn binary_size(&self) -> usize {
                0 $(+ pool_binary_size(&self.$field))*
            }

            pub(crate) fn write_binary(&self, cursor: &mut WriteCursor<'_>, remap: &RemapTable) -> Result<()> {
                $(write_pool_binary(&self.$field, cursor, remap)?;)*
                Ok(())
            }

            pub(crate) fn read_binary(
                &mut self,
                entities: &mut EntityPool,
                cursor: &mut ReadCursor<'_>,
                remap: &RemapTable,
            ) -> Result<()> {
                $(self.read_pool_binary::<$kind>(entities, cursor, remap)?;)*
                Ok(())
            }

            pub(crate) fn write_tree(&self, document: &mut Map<String, Value>, remap: &RemapTable) -> Result<()> {
                $(document.insert(stringify!($field).to_string(), write_pool_tree(&self.$field, remap)?);)*
                Ok(())
            }

            /// Pools missing from `document` are left empty.
            pub(crate) fn read_tree(
                &mut self,
                entities: &mut EntityPool,
                document: &Map<String, Value>,
                remap: &RemapTable,
            ) -> Result<()> {
                $(
                    if let Some(node) = document.get(stringify!($field)) {
                        self.read_pool_tree::<$kind>(entities, node, remap)?;
                    }
                )*
                Ok(())
            }
        }
    };
}

impl Components {
    pub fn get_typed<T: Component>(&self, id: Uid) -> Result<&Attached<T>> {
        T::pool(self).get(id).ok_or_else(|| self.miss(id, T::TYPE))
    }

    pub fn get_typed_mut<T: Component>(&mut self, id: Uid) -> Result<&mut Attached<T>> {
        if !T::pool(self).contains(id) {
            return Err(self.miss(id, T::TYPE));
        }
        T::pool_mut(self).at_mut(id)
    }

    pub fn iter<T: Component>(&self) -> impl Iterator<Item = (Uid, &Attached<T>)> {
        T::pool(self).iter()
    }

    /// Which pool `id` lives in, if any.
    pub fn type_of(&self, id: Uid) -> Option<ComponentType> {
        ComponentType::ALL.iter().copied().find(|&ty| self.contains(ty, id))
    }

    fn miss(&self, id: Uid, expected: ComponentType) -> Error {
        match self.type_of(id) {
            Some(found) => Error::TypeMismatch {
                id,
                expected: expected.pool_name(),
                found: found.pool_name(),
            },
            None => Error::NotFound {
                id,
                pool: expected.pool_name(),
            },
        }
    }

    /// Creates a default `T` on `owner`. If `owner` already had a component in the slot `T` goes to, that component
    /// is destroyed.
    pub fn create_typed<T: Component>(&mut self, entities: &mut EntityPool, owner: Uid) -> Result<(Uid, &mut Attached<T>)> {
        if !entities.contains(owner) {
            return Err(Error::NotFound {
                id: owner,
                pool: ENTITY_POOL,
            });
        }

        let pool = T::pool_mut(self);
        let id = pool.push(Attached::new(owner, T::default()))?;
        pool.at_mut(id)?.id = id;

        let evicted = entities.at_mut(owner)?.attach(ComponentHandle::new(id, T::TYPE));
        if let Some(evicted) = evicted {
            // Already detached from the entity by `attach`
            self.pop(evicted.ty, evicted.id)?;
            log::debug!(
                "replaced {} {:#x} on entity {:#x}",
                evicted.ty.pool_name(),
                evicted.id,
                owner
            );
        }

        log::debug!("created {} {:#x} on entity {:#x}", T::TYPE.pool_name(), id, owner);
        Ok((id, T::pool_mut(self).at_mut(id)?))
    }

    fn copy_typed<T: Component>(&mut self, entities: &mut EntityPool, owner: Uid, source: Uid) -> Result<Uid> {
        let value = self.get_typed::<T>(source)?.value.clone();
        let (id, copy) = self.create_typed::<T>(entities, owner)?;
        copy.value = value;
        Ok(id)
    }

    /// Detaches component `id` from its owner and removes it from its pool.
    pub fn destroy(&mut self, entities: &mut EntityPool, ty: ComponentType, id: Uid) -> Result<()> {
        let owner = self.get(id, ty)?.owner();

        match entities.get_mut(owner) {
            Some(entity) => {
                if !entity.release(ComponentHandle::new(id, ty)) {
                    log::warn!("entity {:#x} did not reference its {} {:#x}", owner, ty.pool_name(), id);
                }
            }
            None => log::warn!("{} {:#x} outlived its entity {:#x}", ty.pool_name(), id, owner),
        }
        self.pop(ty, id)?;

        log::debug!("destroyed {} {:#x}", ty.pool_name(), id);
        Ok(())
    }

    /// Runs the per-frame update of every kind that has one: transforms first, then whatever depends on them.
    pub fn update_all(&mut self, entities: &mut EntityPool) {
        self.update_transforms(entities);
        self.update_cameras(entities);
        self.update_bounds(entities);
    }

    /// Walks the hierarchy breadth-first from every top-level entity so parents are always done before children.
    /// Entities without a transform pass their parent's matrix through.
    fn update_transforms(&mut self, entities: &EntityPool) {
        let mut queue: VecDeque<(Uid, Mat4)> = entities
            .iter()
            .filter(|(_, e)| e.parent() == NULL_UID)
            .map(|(id, _)| (id, Mat4::IDENTITY))
            .collect();

        while let Some((id, parent_global)) = queue.pop_front() {
            let entity = match entities.get(id) {
                Some(entity) => entity,
                None => {
                    log::warn!("dangling child {:#x} skipped", id);
                    continue;
                }
            };

            let global = match self.transforms.get_mut(entity.transform()) {
                Some(transform) => transform.value.propagate(parent_global),
                None => parent_global,
            };
            queue.extend(entity.children().iter().map(|&child| (child, global)));
        }
    }

    fn update_cameras(&mut self, entities: &EntityPool) {
        let transforms = &self.transforms;

        for (_, camera) in self.cameras.iter_mut() {
            let global = entities
                .get(camera.owner())
                .and_then(|e| transforms.get(e.transform()))
                .map_or(Mat4::IDENTITY, |t| t.global());
            camera.value.recompute(global);
        }
    }

    fn update_bounds(&self, entities: &mut EntityPool) {
        for (_, entity) in entities.iter_mut() {
            let primitive = match entity.geometry() {
                Some(handle) if handle.ty == ComponentType::Primitive => self.primitives.get(handle.id),
                _ => None,
            };
            let primitive = match primitive {
                Some(primitive) => primitive,
                None => continue,
            };

            let global = self.transforms.get(entity.transform()).map_or(Mat4::IDENTITY, |t| t.global());
            entity.local_bounds = primitive.shape.local_bounds();
            entity.global_bounds = entity.local_bounds.transformed(&global);
        }
    }

    fn read_pool_binary<T: Component>(
        &mut self,
        entities: &mut EntityPool,
        cursor: &mut ReadCursor<'_>,
        remap: &RemapTable,
    ) -> Result<()> {
        let count = cursor.read_len()?;
        for _ in 0..count {
            let owner = cursor.read_u64()?;
            let value = T::read_binary(cursor, remap)?;
            self.create_typed::<T>(entities, owner)?.1.value = value;
        }
        Ok(())
    }

    fn read_pool_tree<T: Component>(&mut self, entities: &mut EntityPool, node: &Value, remap: &RemapTable) -> Result<()> {
        let object = expect_object(node)?;
        for i in 0..read_count(object)? {
            let node = expect_object(element(object, i)?)?;
            let owner = node
                .get("owner")
                .and_then(Value::as_u64)
                .ok_or(Error::MalformedTree { expected: "component owner" })?;
            let value = read_field(node, "component", T::default(), remap)?;
            self.create_typed::<T>(entities, owner)?.1.value = value;
        }
        Ok(())
    }
}

fn pool_binary_size<T: Component>(pool: &Pool<Attached<T>>) -> usize {
    8 + pool.iter().map(|(_, c)| 8 + c.value.binary_size()).sum::<usize>()
}

fn write_pool_binary<T: Component>(
    pool: &Pool<Attached<T>>,
    cursor: &mut WriteCursor<'_>,
    remap: &RemapTable,
) -> Result<()> {
    cursor.write_len(pool.len())?;
    for (_, c) in pool.iter() {
        cursor.write_u64(c.owner())?;
        c.value.write_binary(cursor, remap)?;
    }
    Ok(())
}

fn write_pool_tree<T: Component>(pool: &Pool<Attached<T>>, remap: &RemapTable) -> Result<Value> {
    let mut object = Map::new();
    object.insert(COUNT_KEY.to_string(), Value::from(pool.len() as u64));

    for (i, (_, c)) in pool.iter().enumerate() {
        let mut node = Map::new();
        node.insert("owner".to_string(), Value::from(c.owner()));
        node.insert("component".to_string(), c.value.write_tree(remap)?);
        object.insert(i.to_string(), Value::Object(node));
    }
    Ok(Value::Object(object))
}

components! {
    Transform => transforms,
    Camera => cameras,
    Light => lights,
    Mesh => meshes,
    Water => waters,
    ParticleEmitter => particle_emitters,
    Primitive => primitives,
    AudioSource => audio_sources,
    Collider => colliders,
}

#[cfg(test)]
mod test {
    use glam::Vec3;

    use corvus_ecs::io::ResourceRef;

    use super::*;

    fn pools() -> (EntityPool, Components, Uid) {
        let config = SceneConfig {
            seed: Some(11),
            ..SceneConfig::default()
        };
        let mut entities = EntityPool::new(&config);
        let root = entities.new_entity("root", NULL_UID).unwrap();
        (entities, Components::new(&config), root)
    }

    #[test]
    fn create_binds_id_and_owner() {
        let (mut entities, mut components, root) = pools();

        let (id, transform) = components.create_typed::<Transform>(&mut entities, root).unwrap();
        assert_eq!(transform.id(), id);
        assert_eq!(transform.owner(), root);
        assert_eq!(transform.scale, Vec3::ONE);
        assert_eq!(entities.at(root).unwrap().transform(), id);

        let (id, view) = components.create(&mut entities, ComponentType::AudioSource, root).unwrap();
        assert_eq!(view.component_type(), ComponentType::AudioSource);
        assert_eq!(view.id(), id);
        assert_eq!(entities.at(root).unwrap().others(), &[ComponentHandle::new(id, ComponentType::AudioSource)]);
    }

    #[test]
    fn create_on_missing_entity() {
        let (mut entities, mut components, _) = pools();

        assert!(matches!(
            components.create(&mut entities, ComponentType::Light, 99),
            Err(Error::NotFound { id: 99, pool: ENTITY_POOL })
        ));
        assert_eq!(components.total_len(), 0);
    }

    #[test]
    fn geometry_slot_is_exclusive() {
        let (mut entities, mut components, root) = pools();

        let (mesh, _) = components.create_typed::<Mesh>(&mut entities, root).unwrap();
        let (water, _) = components.create_typed::<Water>(&mut entities, root).unwrap();

        assert!(!components.contains(ComponentType::Mesh, mesh));
        assert_eq!(components.len(ComponentType::Mesh), 0);
        assert_eq!(
            entities.at(root).unwrap().geometry(),
            Some(ComponentHandle::new(water, ComponentType::Water))
        );
    }

    #[test]
    fn open_list_accumulates() {
        let (mut entities, mut components, root) = pools();

        components.create_typed::<Collider>(&mut entities, root).unwrap();
        components.create_typed::<Collider>(&mut entities, root).unwrap();
        components.create_typed::<AudioSource>(&mut entities, root).unwrap();

        assert_eq!(entities.at(root).unwrap().others().len(), 3);
        assert_eq!(components.total_len(), 3);
    }

    #[test]
    fn destroy_releases_then_pops() {
        let (mut entities, mut components, root) = pools();
        let (id, _) = components.create_typed::<Light>(&mut entities, root).unwrap();

        components.destroy(&mut entities, ComponentType::Light, id).unwrap();
        assert_eq!(entities.at(root).unwrap().light(), None);
        assert_eq!(components.len(ComponentType::Light), 0);

        assert!(matches!(
            components.destroy(&mut entities, ComponentType::Light, id),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn wrong_pool_is_type_mismatch() {
        let (mut entities, mut components, root) = pools();
        let (id, _) = components.create_typed::<Camera>(&mut entities, root).unwrap();

        assert!(matches!(
            components.get(id, ComponentType::Light),
            Err(Error::TypeMismatch { expected: "lights", found: "cameras", .. })
        ));
        assert!(matches!(components.get_typed_mut::<Mesh>(id), Err(Error::TypeMismatch { .. })));
        assert!(matches!(components.get(12345, ComponentType::Camera), Err(Error::NotFound { .. })));
        assert_eq!(components.type_of(id), Some(ComponentType::Camera));
    }

    #[test]
    fn copy_is_deep() {
        let (mut entities, mut components, root) = pools();
        let other = entities.new_entity("other", root).unwrap();

        let (source, mesh) = components.create_typed::<Mesh>(&mut entities, root).unwrap();
        mesh.textures.push(ResourceRef::new("textures/a.png"));

        let copy = components.copy(&mut entities, other, ComponentType::Mesh, source).unwrap();
        assert_ne!(copy, source);

        components.get_typed_mut::<Mesh>(source).unwrap().textures.clear();
        let copied = components.get_typed::<Mesh>(copy).unwrap();
        assert_eq!(copied.textures, vec![ResourceRef::new("textures/a.png")]);
        assert_eq!(copied.owner(), other);
    }

    #[test]
    fn update_propagates_root_first() {
        let (mut entities, mut components, root) = pools();
        let child = entities.new_entity("child", root).unwrap();
        let grandchild = entities.new_entity("grandchild", child).unwrap();

        components.create_typed::<Transform>(&mut entities, root).unwrap().1.position = Vec3::new(1.0, 0.0, 0.0);
        // No transform on `child`: the root's matrix passes straight through
        let (leaf, t) = components.create_typed::<Transform>(&mut entities, grandchild).unwrap();
        t.position = Vec3::new(0.0, 2.0, 0.0);

        let (primitive, _) = components.create_typed::<Primitive>(&mut entities, grandchild).unwrap();
        let (camera, _) = components.create_typed::<Camera>(&mut entities, grandchild).unwrap();

        components.update_all(&mut entities);

        let global = components.get_typed::<Transform>(leaf).unwrap().global();
        assert_eq!(global.transform_point3(Vec3::ZERO), Vec3::new(1.0, 2.0, 0.0));

        let camera = components.get_typed::<Camera>(camera).unwrap();
        let eye = camera.get_view_mat().transform_point3(Vec3::new(1.0, 2.0, 0.0));
        assert!(eye.abs_diff_eq(Vec3::ZERO, 1e-6));

        let bounds = entities.at(grandchild).unwrap().global_bounds;
        assert_eq!(bounds.center(), Vec3::new(1.0, 2.0, 0.0));
        assert_eq!(bounds.size(), Vec3::ONE);
        assert!(components.contains(ComponentType::Primitive, primitive));
    }

    #[test]
    fn all_of_type_and_clear() {
        let (mut entities, mut components, root) = pools();
        let a = entities.new_entity("a", root).unwrap();

        components.create_typed::<Transform>(&mut entities, root).unwrap();
        components.create_typed::<Transform>(&mut entities, a).unwrap();

        let all = components.all_of_type(ComponentType::Transform);
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|(id, c)| c.id() == *id && c.component_type() == ComponentType::Transform));
        assert_eq!(components.iter::<Transform>().count(), 2);

        components.clear();
        assert_eq!(components.total_len(), 0);
    }
}
