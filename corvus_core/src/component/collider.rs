use glam::Vec3;

use corvus_ecs::Serializable;

#[derive(Serializable, Clone, Debug, PartialEq)]
pub enum ColliderShape {
    Box { half_extents: Vec3 },
    Sphere { radius: f32 },
    Capsule { radius: f32, height: f32 },
}

impl Default for ColliderShape {
    fn default() -> Self {
        ColliderShape::Box { half_extents: Vec3::splat(0.5) }
    }
}

#[derive(Serializable, Clone, Debug, PartialEq, Default)]
pub struct Collider {
    pub shape: ColliderShape,
    pub offset: Vec3,
    pub is_trigger: bool,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::component::assert_round_trips;

    #[test]
    fn every_shape_round_trips() {
        let shapes = vec![
            ColliderShape::Box { half_extents: Vec3::new(1.0, 2.0, 3.0) },
            ColliderShape::Sphere { radius: 0.75 },
            ColliderShape::Capsule { radius: 0.4, height: 1.8 },
        ];

        for shape in shapes {
            assert_round_trips(&Collider {
                shape,
                offset: Vec3::new(0.0, 0.9, 0.0),
                is_trigger: true,
            });
        }
    }
}
