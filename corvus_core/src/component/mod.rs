use std::ops::{Deref, DerefMut};

use corvus_ecs::{Uid, NULL_UID};

pub use crate::registry::{Component, ComponentMut, ComponentRef, ComponentType};
pub use audio::AudioSource;
pub use camera::{Camera, Projection};
pub use collider::{Collider, ColliderShape};
pub use geometry::{Mesh, ParticleEmitter, Primitive, Shape, Water};
pub use light::{Light, LightKind};
pub use transform::Transform;

mod audio;
mod camera;
mod collider;
mod geometry;
mod light;
mod transform;

/// Saves `value` in both forms and checks that each loads back equal.
#[cfg(test)]
pub(crate) fn assert_round_trips<T>(value: &T)
where
    T: corvus_ecs::io::Serializable + Default + PartialEq + std::fmt::Debug,
{
    use corvus_ecs::io::{from_bytes, to_bytes, RemapTable};

    let mut remap = RemapTable::new();
    value.intern_resources(&mut remap);

    let bytes = to_bytes(value, &remap).unwrap();
    assert_eq!(bytes.len(), value.binary_size());
    assert_eq!(&from_bytes::<T>(&bytes, &remap).unwrap(), value);

    let tree = value.write_tree(&remap).unwrap();
    assert_eq!(&T::read_tree(&tree, T::default(), &remap).unwrap(), value);
}

/// A component payload as stored in its pool: the payload plus its own id and a weak reference to the entity that
/// owns it.
///
/// Derefs to the payload.
#[derive(Clone, Debug, PartialEq)]
pub struct Attached<T> {
    pub(crate) id: Uid,
    pub(crate) owner: Uid,
    pub value: T,
}

impl<T> Attached<T> {
    pub(crate) fn new(owner: Uid, value: T) -> Self {
        Attached {
            id: NULL_UID,
            owner,
            value,
        }
    }

    pub fn id(&self) -> Uid {
        self.id
    }

    pub fn owner(&self) -> Uid {
        self.owner
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> Deref for Attached<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for Attached<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

/// What an entity remembers about one of its components.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ComponentHandle {
    pub id: Uid,
    pub ty: ComponentType,
}

impl ComponentHandle {
    pub fn new(id: Uid, ty: ComponentType) -> Self {
        ComponentHandle { id, ty }
    }
}

/// Where on the entity a reference to a component of a given kind is kept.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AttachSlot {
    Transform,
    Camera,
    Light,
    /// Shared by every kind that draws the entity; only one of them can be attached at a time
    Geometry,
    Other,
}

impl ComponentType {
    pub fn slot(self) -> AttachSlot {
        match self {
            ComponentType::Transform => AttachSlot::Transform,
            ComponentType::Camera => AttachSlot::Camera,
            ComponentType::Light => AttachSlot::Light,
            ComponentType::Mesh
            | ComponentType::Water
            | ComponentType::ParticleEmitter
            | ComponentType::Primitive => AttachSlot::Geometry,
            ComponentType::AudioSource | ComponentType::Collider => AttachSlot::Other,
        }
    }
}
