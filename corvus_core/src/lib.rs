//! Scene graph of the engine: entities, the components attached to them, and the `Scene` that updates the graph
//! every frame and saves or loads it as a whole.

pub use glam;

pub mod ecs {
    pub use corvus_ecs::*;
}

pub use corvus_ecs::{Error, Result, Uid, NULL_UID};

pub use bounds::Aabb;
pub use config::SceneConfig;
pub use entity::{Entity, EntityPool};
pub use registry::Components;
pub use scene::Scene;

pub mod bounds;
pub mod component;
pub mod config;
pub mod entity;
pub mod registry;
pub mod scene;
