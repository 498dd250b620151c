use glam::{Mat4, Vec3};

use corvus_ecs::Serializable;

/// Axis-aligned bounding box.
#[derive(Serializable, Clone, Copy, Debug, PartialEq, Default)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Aabb { min, max }
    }

    pub fn from_half_extents(half: Vec3) -> Self {
        Aabb { min: -half, max: half }
    }

    pub fn center(&self) -> Vec3 {
        0.5 * (self.min + self.max)
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Smallest box holding all eight corners of `self` once moved by `m`.
    pub fn transformed(&self, m: &Mat4) -> Aabb {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);

        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            let p = m.transform_point3(corner);
            min = min.min(p);
            max = max.max(p);
        }

        Aabb { min, max }
    }
}
