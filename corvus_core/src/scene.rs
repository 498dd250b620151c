use corvus_ecs::io::{expect_object, Map, ReadCursor, RemapTable, Value, WriteCursor};
use corvus_ecs::{Error, Result, Uid};

use crate::component::{Attached, Component, ComponentMut, ComponentType, Transform};
use crate::config::SceneConfig;
use crate::entity::{Entity, EntityPool};
use crate::registry::Components;

const RESOURCES_KEY: &str = "resources";
const ENTITIES_KEY: &str = "entities";

/// An entity hierarchy together with every component attached to it.
///
/// This is what the rest of the engine talks to: it keeps the entity and component pools consistent with each
/// other, runs the per-frame update and converts the whole graph to and from its persisted forms.
pub struct Scene {
    config: SceneConfig,
    entities: EntityPool,
    components: Components,
}

impl Default for Scene {
    fn default() -> Self {
        Scene::with_config(SceneConfig::default())
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SceneConfig) -> Self {
        Scene {
            entities: EntityPool::new(&config),
            components: Components::new(&config),
            config,
        }
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn entities(&self) -> &EntityPool {
        &self.entities
    }

    pub fn components(&self) -> &Components {
        &self.components
    }

    pub fn components_mut(&mut self) -> &mut Components {
        &mut self.components
    }

    pub fn root_id(&self) -> Option<Uid> {
        self.entities.root_id()
    }

    pub fn entity(&self, id: Uid) -> Result<&Entity> {
        self.entities.at(id)
    }

    pub fn entity_mut(&mut self, id: Uid) -> Result<&mut Entity> {
        self.entities.at_mut(id)
    }

    /// Creates an entity under `parent` (`0` for the root) with a default transform attached.
    pub fn new_entity(&mut self, name: &str, parent: Uid) -> Result<Uid> {
        let id = self.entities.new_entity(name, parent)?;
        self.components.create_typed::<Transform>(&mut self.entities, id)?;
        Ok(id)
    }

    pub fn destroy_entity(&mut self, id: Uid) -> Result<()> {
        self.entities.destroy(&mut self.components, id)
    }

    pub fn set_parent(&mut self, id: Uid, parent: Uid) -> Result<()> {
        self.entities.set_parent(id, parent)
    }

    pub fn add_component<T: Component>(&mut self, owner: Uid) -> Result<(Uid, &mut Attached<T>)> {
        self.components.create_typed::<T>(&mut self.entities, owner)
    }

    pub fn add_component_of(&mut self, ty: ComponentType, owner: Uid) -> Result<(Uid, ComponentMut<'_>)> {
        self.components.create(&mut self.entities, ty, owner)
    }

    pub fn remove_component(&mut self, ty: ComponentType, id: Uid) -> Result<()> {
        self.components.destroy(&mut self.entities, ty, id)
    }

    pub fn get<T: Component>(&self, id: Uid) -> Result<&Attached<T>> {
        self.components.get_typed::<T>(id)
    }

    pub fn get_mut<T: Component>(&mut self, id: Uid) -> Result<&mut Attached<T>> {
        self.components.get_typed_mut::<T>(id)
    }

    /// The first `T` attached to `entity`.
    pub fn component_of<T: Component>(&self, entity: Uid) -> Result<Option<&Attached<T>>> {
        let handle = self.entities.at(entity)?.handles().into_iter().find(|h| h.ty == T::TYPE);
        match handle {
            Some(handle) => self.get::<T>(handle.id).map(Some),
            None => Ok(None),
        }
    }

    /// Deep-copies `id` and its subtree next to the original. Every copied entity and component gets a fresh id.
    pub fn duplicate_entity(&mut self, id: Uid) -> Result<Uid> {
        let parent = self.entities.at(id)?.parent();
        let copy = self.copy_subtree(id, parent)?;

        log::debug!("duplicated entity {:#x} as {:#x}", id, copy);
        Ok(copy)
    }

    fn copy_subtree(&mut self, source: Uid, parent: Uid) -> Result<Uid> {
        let original = self.entities.at(source)?.clone();

        let copy = self.entities.new_entity(&original.name, parent)?;
        {
            let entity = self.entities.at_mut(copy)?;
            entity.active = original.active;
            entity.is_static = original.is_static;
            entity.local_bounds = original.local_bounds;
            entity.global_bounds = original.global_bounds;
        }

        for handle in original.handles() {
            self.components.copy(&mut self.entities, copy, handle.ty, handle.id)?;
        }
        for &child in original.children() {
            self.copy_subtree(child, copy)?;
        }
        Ok(copy)
    }

    /// Per-frame update.
    pub fn update(&mut self) {
        self.components.update_all(&mut self.entities);
    }

    pub fn clear(&mut self) {
        self.components.clear();
        self.entities.clear();
    }

    /// Table holding every resource the scene refers to, appended to `seed` if one is given.
    pub fn remap_table(&self, seed: Option<&RemapTable>) -> RemapTable {
        let mut remap = seed.cloned().unwrap_or_default();
        self.components.intern_resources(&mut remap);
        remap
    }

    pub fn save_tree(&self, seed: Option<&RemapTable>) -> Result<Value> {
        let remap = self.remap_table(seed);

        let mut document = Map::new();
        document.insert(RESOURCES_KEY.to_string(), remap.write_tree());
        document.insert(ENTITIES_KEY.to_string(), self.entities.write_tree(&remap)?);
        self.components.write_tree(&mut document, &remap)?;

        log::debug!(
            "saved {} entities, {} components and {} resources as a tree",
            self.entities.len(),
            self.components.total_len(),
            remap.len()
        );
        Ok(Value::Object(document))
    }

    /// Builds a new scene from a document produced by `save_tree`.
    pub fn load_tree(document: &Value, config: SceneConfig) -> Result<Scene> {
        let document = expect_object(document)?;

        let remap = match document.get(RESOURCES_KEY) {
            Some(node) => RemapTable::read_tree(node)?,
            None => RemapTable::new(),
        };

        let mut scene = Scene::with_config(config);
        if let Some(node) = document.get(ENTITIES_KEY) {
            scene.entities.read_tree(node, &remap)?;
        }
        scene.entities.validate_links()?;
        scene.components.read_tree(&mut scene.entities, document, &remap)?;

        scene.loaded(remap.len());
        Ok(scene)
    }

    pub fn save_binary(&self, seed: Option<&RemapTable>) -> Result<Vec<u8>> {
        let remap = self.remap_table(seed);

        let size = remap.binary_size() + self.entities.binary_size() + self.components.binary_size();
        let mut buf = vec![0; size];

        let mut cursor = WriteCursor::new(&mut buf);
        remap.write_binary(&mut cursor)?;
        self.entities.write_binary(&mut cursor, &remap)?;
        self.components.write_binary(&mut cursor, &remap)?;
        cursor.finish()?;

        log::debug!("saved scene as {} bytes", size);
        Ok(buf)
    }

    /// Builds a new scene from a blob produced by `save_binary`. The blob must be consumed exactly.
    pub fn load_binary(bytes: &[u8], config: SceneConfig) -> Result<Scene> {
        let mut cursor = ReadCursor::new(bytes);
        let remap = RemapTable::read_binary(&mut cursor)?;

        let mut scene = Scene::with_config(config);
        scene.entities.read_binary(&mut cursor, &remap)?;
        scene.entities.validate_links()?;
        scene.components.read_binary(&mut scene.entities, &mut cursor, &remap)?;

        if !cursor.is_exhausted() {
            return Err(Error::SerializationLengthMismatch {
                expected: cursor.position(),
                actual: bytes.len(),
            });
        }

        scene.loaded(remap.len());
        Ok(scene)
    }

    fn loaded(&mut self, resources: usize) {
        self.update();
        log::debug!(
            "loaded {} entities, {} components and {} resources",
            self.entities.len(),
            self.components.total_len(),
            resources
        );
    }
}
