use glam::{Mat4, Quat, Vec3};

use corvus_ecs::Serializable;

/// Position, rotation and scale relative to the parent entity.
///
/// `local` and `global` are recomputed by `Components::update_all` and are never persisted.
#[derive(Serializable, Clone, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,

    #[serializable(skip)]
    pub(crate) local: Mat4,
    #[serializable(skip)]
    pub(crate) global: Mat4,
}

impl Default for Transform {
    fn default() -> Self {
        Transform {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,

            local: Mat4::IDENTITY,
            global: Mat4::IDENTITY,
        }
    }
}

impl Transform {
    pub fn from_xyz(x: f32, y: f32, z: f32) -> Self {
        Transform {
            position: Vec3::new(x, y, z),
            ..Transform::default()
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Local matrix as of the last update.
    pub fn local(&self) -> Mat4 {
        self.local
    }

    /// World matrix as of the last update.
    pub fn global(&self) -> Mat4 {
        self.global
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation.mul_vec3(-Vec3::Z).normalize()
    }

    /// Recomputes the cached matrices given the parent's world matrix and returns the new world matrix.
    pub(crate) fn propagate(&mut self, parent_global: Mat4) -> Mat4 {
        self.local = self.matrix();
        self.global = parent_global * self.local;
        self.global
    }
}
