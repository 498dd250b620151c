use glam::{Mat4, Vec4};

use corvus_ecs::Serializable;

#[derive(Serializable, Clone, Debug, PartialEq)]
pub enum Projection {
    /// Vertical field of view, in degrees
    Perspective { fov_y: f32 },
    /// Height of the view volume in world units
    Orthographic { height: f32 },
}

impl Default for Projection {
    fn default() -> Self {
        Projection::Perspective { fov_y: 45.0 }
    }
}

#[derive(Serializable, Clone, Debug, PartialEq)]
pub struct Camera {
    pub projection: Projection,
    pub near: f32,
    pub far: f32,
    pub aspect_ratio: f32,
    pub clear_color: Vec4,
    pub primary: bool,

    #[serializable(skip)]
    view: Mat4,
    #[serializable(skip)]
    proj: Mat4,
}

impl Default for Camera {
    fn default() -> Self {
        Camera {
            projection: Projection::default(),
            near: 0.1,
            far: 100.0,
            aspect_ratio: 1.0,
            clear_color: Vec4::new(0.1, 0.1, 0.1, 1.0),
            primary: false,

            view: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
        }
    }
}

impl Camera {
    pub fn get_view_mat(&self) -> Mat4 {
        self.view
    }

    pub fn get_proj_mat(&self) -> Mat4 {
        self.proj
    }

    /// Rebuilds the view and projection matrices from the owner's world matrix.
    pub(crate) fn recompute(&mut self, owner_global: Mat4) {
        self.view = owner_global.inverse();

        self.proj = match self.projection {
            Projection::Perspective { fov_y } => {
                Mat4::perspective_rh_gl(fov_y.to_radians(), self.aspect_ratio, self.near, self.far)
            }
            Projection::Orthographic { height } => {
                let half_h = 0.5 * height;
                let half_w = half_h * self.aspect_ratio;
                Mat4::orthographic_rh_gl(-half_w, half_w, -half_h, half_h, self.near, self.far)
            }
        };
    }
}
